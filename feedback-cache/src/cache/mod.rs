//! # Result Cache
//!
//! TTL-bounded cache for analysis results, keyed by request fingerprint.
//!
//! ## Features
//!
//! - **Deterministic keys**: SHA-256 over a canonical encoding of the request
//! - **Two backends**: a process-local map or a shared DynamoDB table
//! - **Lazy expiry**: dead entries are dropped by the read that finds them
//! - **Metrics**: hit/miss/set counters per manager instance
//! - **Fail-open**: store failures degrade to cache misses
//!
//! ## Example
//!
//! ```rust
//! use feedback_cache::cache::{fingerprint, CacheConfig, CacheManager};
//! use serde_json::json;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cache = CacheManager::from_config(&CacheConfig::default()).await?;
//!
//! let key = fingerprint::derive("great product", "", ["sentiment_analysis"])?;
//! cache.set(key.clone(), json!({"sentiment": "positive"})).await;
//!
//! if let Some(value) = cache.get(&key).await {
//!     println!("Cache hit: {}", value);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod fingerprint;
pub mod manager;
pub mod memory;
pub mod persistent;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder, CacheType, DynamoDbConfig};
pub use entry::CacheEntry;
pub use manager::{CacheBackend, CacheManager};
pub use memory::{Lookup, MemoryStore};
pub use persistent::PersistentCache;
pub use types::{CacheKey, CacheMetrics, CacheValue, CachedRecord};
