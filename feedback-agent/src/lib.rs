//! Feedback analysis with cached tool results
//!
//! [`ToolAgent`] runs analysis tools over customer feedback and keeps the
//! combined result in a [`feedback_cache::CacheManager`], so that a repeated
//! request is answered without another model call.

pub mod agent;
pub mod config;
pub mod error;
pub mod input;
pub mod llm;
pub mod tools;

pub use agent::{AnalysisResult, ToolAgent};
pub use config::AgentConfig;
pub use error::{AgentError, ErrorResponse, Result};
pub use input::{BatchInput, FeedbackInput, Submission};
pub use llm::{CompletionRequest, LlmClient, Provider};
pub use tools::{default_tools, LlmTool, Tool, ToolKind, ToolRegistry};
