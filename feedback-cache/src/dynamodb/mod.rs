//! DynamoDB table access for the persistent cache backend
//!
//! The persistent backend talks to its table through [`ItemStore`], a thin
//! async seam over the handful of DynamoDB operations the cache needs.
//! [`DynamoDbStore`] implements it with the AWS SDK.
//!
//! ## Item layout
//!
//! | attribute      | type | notes                                  |
//! |----------------|------|----------------------------------------|
//! | `cache_key`    | S    | partition key, 64 hex chars            |
//! | `value`        | S    | JSON result document                   |
//! | `expiry`       | N    | epoch seconds; dead once `now >= expiry` |
//! | `last_updated` | N    | epoch seconds of the last write        |
//! | `feedback_id`  | S    | optional, key of the origin GSI        |

pub mod client;

pub use client::{DynamoDbStore, HealthCheckResult, HealthStatus};

use crate::cache::types::CacheKey;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const ATTR_CACHE_KEY: &str = "cache_key";
pub const ATTR_VALUE: &str = "value";
pub const ATTR_EXPIRY: &str = "expiry";
pub const ATTR_LAST_UPDATED: &str = "last_updated";
pub const ATTR_ORIGIN: &str = "feedback_id";

/// Maximum number of write requests in one `BatchWriteItem` call
pub const BATCH_WRITE_LIMIT: usize = 25;

/// Resubmissions of unprocessed keys before `clear` gives up on a page
pub const UNPROCESSED_RESUBMIT_LIMIT: u32 = 5;

/// One row of the cache table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheItem {
    pub cache_key: CacheKey,

    /// Serialized JSON document
    pub value: String,

    /// Epoch seconds
    pub expiry: i64,

    /// Epoch seconds
    pub last_updated: i64,

    pub feedback_id: Option<String>,
}

impl CacheItem {
    /// Check expiry against an epoch-seconds timestamp
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expiry
    }
}

/// One page of a key scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    pub keys: Vec<CacheKey>,

    /// Continuation token; `None` once the scan is complete
    pub last_evaluated_key: Option<CacheKey>,
}

/// Table operations used by the persistent backend
///
/// Implementations report failures as `CacheError::Backend`, and items whose
/// attributes cannot be decoded as `CacheError::Serialization`.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Fetch an item by primary key
    async fn get_item(&self, key: &str) -> Result<Option<CacheItem>>;

    /// Create or replace an item
    async fn put_item(&self, item: CacheItem) -> Result<()>;

    /// Delete an item; succeeds when the key is absent
    async fn delete_item(&self, key: &str) -> Result<()>;

    /// Scan one page of primary keys, starting after `start`
    async fn scan_keys(&self, start: Option<CacheKey>) -> Result<ScanPage>;

    /// Delete many keys; returns the keys the store left unprocessed
    ///
    /// Unprocessed keys are part of a successful response (the table was
    /// throttled) and should be resubmitted.
    async fn batch_delete(&self, keys: &[CacheKey]) -> Result<Vec<CacheKey>>;

    /// All items recorded with the given origin
    async fn query_origin(&self, origin: &str) -> Result<Vec<CacheItem>>;
}
