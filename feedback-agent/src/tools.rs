//! Analysis tools and their registry

use crate::error::{AgentError, Result};
use crate::input::FeedbackInput;
use crate::llm::{CompletionRequest, LlmClient};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Built-in analysis kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    SentimentAnalysis,
    TopicCategorization,
    KeywordContextualization,
    Summarization,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::SentimentAnalysis,
        ToolKind::TopicCategorization,
        ToolKind::KeywordContextualization,
        ToolKind::Summarization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::SentimentAnalysis => "sentiment_analysis",
            ToolKind::TopicCategorization => "topic_categorization",
            ToolKind::KeywordContextualization => "keyword_contextualization",
            ToolKind::Summarization => "summarization",
        }
    }

    fn system_prompt(&self) -> &'static str {
        match self {
            ToolKind::SentimentAnalysis => "You are a sentiment analysis assistant.",
            ToolKind::TopicCategorization => "You are a topic categorization assistant.",
            ToolKind::KeywordContextualization => "You are a keyword extraction assistant.",
            ToolKind::Summarization => "You are a summarization assistant.",
        }
    }

    fn task(&self) -> &'static str {
        match self {
            ToolKind::SentimentAnalysis => {
                "Analyze the sentiment of the following text. Respond with a JSON object \
                 containing overall_sentiment (positive, negative or neutral), scores \
                 (positive, negative and neutral, summing to 1.0) and explanation."
            }
            ToolKind::TopicCategorization => {
                "Categorize the following text into relevant topics. Respond with a JSON \
                 object containing primary_topic, topics (topic name to relevance between \
                 0.0 and 1.0) and explanation."
            }
            ToolKind::KeywordContextualization => {
                "Extract the most important keywords or phrases from the following text. \
                 Respond with a JSON object containing keywords, an array of objects with \
                 keyword, relevance between 0.0 and 1.0 and context."
            }
            ToolKind::Summarization => {
                "Summarize the following text and suggest actionable recommendations. \
                 Respond with a JSON object containing summary, recommendations and \
                 key_points."
            }
        }
    }
}

impl FromStr for ToolKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        ToolKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AgentError::UnsupportedTool(s.to_string()))
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tool names run when a request does not choose any
pub fn default_tools() -> Vec<String> {
    ToolKind::ALL.iter().map(|kind| kind.to_string()).collect()
}

/// One analysis over a feedback record
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, input: &FeedbackInput) -> Result<Value>;
}

/// Tool answered by a language model
pub struct LlmTool {
    kind: ToolKind,
    client: Arc<dyn LlmClient>,
}

impl LlmTool {
    pub fn new(kind: ToolKind, client: Arc<dyn LlmClient>) -> Self {
        Self { kind, client }
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    fn prompt(&self, input: &FeedbackInput) -> String {
        let mut prompt = format!("{}\n\nText: \"{}\"", self.kind.task(), input.feedback_text);
        if !input.instructions().is_empty() {
            prompt.push_str("\n\nAdditional instructions: ");
            prompt.push_str(input.instructions());
        }
        prompt
    }
}

#[async_trait]
impl Tool for LlmTool {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    async fn execute(&self, input: &FeedbackInput) -> Result<Value> {
        if input.feedback_text.trim().is_empty() {
            return Err(AgentError::InvalidInput(format!(
                "No text provided for {}",
                self.kind
            )));
        }

        debug!(
            "Running {} with {} ({})",
            self.kind,
            self.client.provider(),
            self.client.model()
        );

        let request = CompletionRequest::new(self.kind.system_prompt(), self.prompt(input));
        let reply = self.client.complete(request).await?;

        Ok(match extract_json_object(&reply) {
            Some(value) => value,
            None => {
                warn!("{} reply contained no JSON object", self.kind);
                json!({ "raw": reply })
            }
        })
    }
}

/// First JSON object embedded in `text`, if any
pub fn extract_json_object(text: &str) -> Option<Value> {
    text.match_indices('{').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Value>()
            .next()
            .and_then(|parsed| parsed.ok())
            .filter(Value::is_object)
    })
}

/// Tools by name
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in tool backed by `client`
    pub fn with_llm(client: Arc<dyn LlmClient>) -> Self {
        let mut registry = Self::new();
        for kind in ToolKind::ALL {
            registry.register(Arc::new(LlmTool::new(kind, Arc::clone(&client))));
        }
        registry
    }

    /// Add a tool, replacing any tool of the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| AgentError::UnsupportedTool(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
