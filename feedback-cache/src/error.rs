//! Error types for cache operations
//!
//! Configuration problems are the only errors that reach callers of the
//! cache. Backend and serialization failures are produced by the DynamoDB
//! store and absorbed by the persistent backend.

use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backing store rejected or failed a request
    #[error("Backend error: {0}")]
    Backend(String),

    /// A stored payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Operation timeout
    #[error("Operation timed out after {timeout_seconds}s: {context}")]
    Timeout {
        timeout_seconds: u64,
        context: String,
    },
}

impl CacheError {
    /// True for errors caused by a malformed stored item rather than the store itself
    pub fn is_corrupt_entry(&self) -> bool {
        matches!(self, CacheError::Serialization(_))
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CacheError::Config("unsupported cache type: redis".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: unsupported cache type: redis"
        );

        let timeout_error = CacheError::Timeout {
            timeout_seconds: 5,
            context: "describe table".to_string(),
        };
        assert!(timeout_error.to_string().contains("timed out after 5s"));
    }

    #[test]
    fn test_serde_error_is_corrupt_entry() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: CacheError = parse.into();
        assert!(error.is_corrupt_entry());
    }
}
