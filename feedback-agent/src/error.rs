//! Error types for request processing

use feedback_cache::CacheError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported tool type: {0}")]
    UnsupportedTool(String),

    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;

/// Error document returned in place of an analysis result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub feedback_id: String,
    pub error: String,
    pub error_type: String,
    pub suggestion: String,
}

impl AgentError {
    /// Short machine-readable category
    pub fn error_type(&self) -> &'static str {
        match self {
            AgentError::InvalidInput(_) => "InvalidInput",
            AgentError::UnsupportedTool(_) => "UnsupportedTool",
            AgentError::Llm(_) => "LlmError",
            AgentError::Config(_) => "ConfigError",
            AgentError::Cache(_) => "CacheError",
            AgentError::Serialization(_) => "SerializationError",
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            AgentError::InvalidInput(_) | AgentError::UnsupportedTool(_) => {
                "Check the input format and values"
            }
            AgentError::Serialization(_) => "Check that the input is valid JSON",
            AgentError::Cache(_) | AgentError::Config(_) => {
                "Check the cache configuration and AWS credentials"
            }
            AgentError::Llm(_) => "Check the logs for more information",
        }
    }

    /// Log the error and build the response document for `feedback_id`
    pub fn to_response(&self, feedback_id: &str) -> ErrorResponse {
        error!("Error processing feedback {}: {}", feedback_id, self);

        ErrorResponse {
            feedback_id: feedback_id.to_string(),
            error: self.to_string(),
            error_type: self.error_type().to_string(),
            suggestion: self.suggestion().to_string(),
        }
    }
}
