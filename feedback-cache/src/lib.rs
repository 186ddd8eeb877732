//! # Feedback Cache (feedback-cache)
//!
//! Result cache for LLM-backed feedback analysis.
//!
//! Analysis requests are expensive, slow and rate limited. This crate keeps
//! their results keyed by a fingerprint of the request so that identical
//! requests are answered without another model call.
//!
//! ## Components
//!
//! - [`cache::fingerprint`] derives the key for `(text, instructions, tools)`
//! - [`CacheManager`] is the single entry point: `get`, `set`, `delete`,
//!   `clear`, `get_metrics`
//! - [`cache::MemoryStore`] and [`cache::PersistentCache`] are the two
//!   backends; the persistent one reaches DynamoDB through [`dynamodb::ItemStore`]
//!
//! ## Persistent backend
//!
//! ```no_run
//! use feedback_cache::{CacheConfig, CacheManager, CacheType};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CacheConfig::builder()
//!         .cache_type(CacheType::Persistent)
//!         .table_name("LLMAgentCache")
//!         .region("us-east-1")
//!         .ttl(Duration::from_secs(3600))
//!         .build();
//!
//!     let cache = CacheManager::from_config(&config).await?;
//!     let cached = cache.get("15bc9a5c70dfc4fa0fbca54bdd80dede18491cf6a942b7cc673564a2ee8ea6fd").await;
//!     println!("cached: {:?}", cached);
//!     println!("{}", cache.get_metrics().await);
//!     Ok(())
//! }
//! ```
//!
//! Store failures never surface as errors from the manager: a lookup that
//! cannot be served is a miss, a write that cannot be performed is logged.

pub mod cache;
pub mod dynamodb;
pub mod error;

// Re-export main types for convenience
pub use cache::{
    fingerprint::derive as derive_cache_key, CacheConfig, CacheConfigBuilder, CacheKey,
    CacheManager, CacheMetrics, CacheType, CacheValue, CachedRecord, DynamoDbConfig,
    PersistentCache,
};
pub use dynamodb::{DynamoDbStore, HealthCheckResult, HealthStatus, ItemStore};
pub use error::{CacheError, Result};
