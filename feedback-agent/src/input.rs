//! Feedback records accepted by the agent

use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One piece of customer feedback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackInput {
    pub feedback_id: String,
    pub feedback_text: String,

    /// Free-form analysis instructions; part of the cache key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl FeedbackInput {
    pub fn new(feedback_id: impl Into<String>, feedback_text: impl Into<String>) -> Self {
        Self {
            feedback_id: feedback_id.into(),
            feedback_text: feedback_text.into(),
            instructions: None,
            customer_name: None,
            timestamp: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Instructions, or the empty string when none were given
    pub fn instructions(&self) -> &str {
        self.instructions.as_deref().unwrap_or("")
    }

    /// Parse and validate a JSON record
    pub fn from_json(json: &str) -> Result<Self> {
        let input: Self =
            serde_json::from_str(json).map_err(|e| AgentError::InvalidInput(e.to_string()))?;
        input.validate()?;
        Ok(input)
    }

    pub fn validate(&self) -> Result<()> {
        if self.feedback_id.trim().is_empty() {
            warn!("feedback_id cannot be empty");
            return Err(AgentError::InvalidInput(
                "feedback_id cannot be empty".to_string(),
            ));
        }

        if self.feedback_text.trim().is_empty() {
            warn!("feedback_text cannot be empty for {}", self.feedback_id);
            return Err(AgentError::InvalidInput(
                "feedback_text cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// A batch of feedback records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInput {
    pub feedback: Vec<FeedbackInput>,
}

impl BatchInput {
    pub fn validate(&self) -> Result<()> {
        if self.feedback.is_empty() {
            return Err(AgentError::InvalidInput(
                "feedback list cannot be empty".to_string(),
            ));
        }

        for (i, entry) in self.feedback.iter().enumerate() {
            entry.validate().map_err(|e| {
                AgentError::InvalidInput(format!("invalid feedback entry at index {}: {}", i, e))
            })?;
        }

        Ok(())
    }
}

/// Either a single record or a batch, as read from a request body or file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Submission {
    Batch(BatchInput),
    Single(FeedbackInput),
}

impl Submission {
    pub fn from_json(json: &str) -> Result<Self> {
        let submission: Self =
            serde_json::from_str(json).map_err(|e| AgentError::InvalidInput(e.to_string()))?;
        submission.validate()?;
        Ok(submission)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Submission::Batch(batch) => batch.validate(),
            Submission::Single(input) => input.validate(),
        }
    }

    pub fn records(&self) -> &[FeedbackInput] {
        match self {
            Submission::Batch(batch) => &batch.feedback,
            Submission::Single(input) => std::slice::from_ref(input),
        }
    }
}
