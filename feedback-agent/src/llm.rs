//! Boundary to the language model providers

use crate::error::{AgentError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported model providers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Anthropic,
    Bedrock,
    Groq,
}

impl Provider {
    /// Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4",
            Provider::Anthropic => "claude-3-opus-20240229",
            Provider::Bedrock => "anthropic.claude-3-sonnet-20240229",
            Provider::Groq => "llama3-70b-8192",
        }
    }
}

impl FromStr for Provider {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            "bedrock" => Ok(Provider::Bedrock),
            "groq" => Ok(Provider::Groq),
            other => Err(AgentError::Config(format!(
                "unsupported LLM provider: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Bedrock => "bedrock",
            Provider::Groq => "groq",
        };
        write!(f, "{}", name)
    }
}

/// A single-turn completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: 0.1,
            max_tokens: 1000,
        }
    }
}

/// Chat-completion client for one provider and model
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    fn model(&self) -> &str;

    /// Send the request and return the reply text
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}
