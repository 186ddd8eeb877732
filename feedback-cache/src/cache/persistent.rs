//! Durable cache backend over an [`ItemStore`]
//!
//! Every failure stops here. A lookup that cannot be served is a miss; a
//! write that cannot be performed is logged and dropped. The cache is an
//! optimization, so callers always fall through to recomputation.

use crate::cache::config::DynamoDbConfig;
use crate::cache::types::{CacheKey, CacheValue, CachedRecord};
use crate::dynamodb::{CacheItem, DynamoDbStore, ItemStore, UNPROCESSED_RESUBMIT_LIMIT};
use crate::error::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Persistent cache with lazy expiry
pub struct PersistentCache {
    store: Arc<dyn ItemStore>,
}

impl PersistentCache {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// Connect to the configured DynamoDB table
    pub async fn connect(config: &DynamoDbConfig) -> Result<Self> {
        let store = DynamoDbStore::connect(config).await?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Fetch a live value
    ///
    /// Expired items and items whose payload cannot be decoded are deleted
    /// before absence is reported.
    pub async fn get(&self, key: &str) -> Option<CacheValue> {
        let item = match self.store.get_item(key).await {
            Ok(Some(item)) => item,
            Ok(None) => return None,
            Err(e) if e.is_corrupt_entry() => {
                warn!("Unreadable cache item {}: {}", key, e);
                self.delete(key).await;
                return None;
            }
            Err(e) => {
                warn!("Error getting cache item {}: {}", key, e);
                return None;
            }
        };

        if item.is_expired_at(Utc::now().timestamp()) {
            info!("Cache entry expired for key: {}", key);
            self.delete(key).await;
            return None;
        }

        match serde_json::from_str(&item.value) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Corrupt cached payload for {}: {}", key, e);
                self.delete(key).await;
                None
            }
        }
    }

    /// Write a value that expires `ttl` from now
    pub async fn set(&self, key: &str, value: &CacheValue, ttl: Duration, origin: Option<&str>) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Cannot serialize cache value for {}: {}", key, e);
                return;
            }
        };

        let now = Utc::now().timestamp();
        let item = CacheItem {
            cache_key: key.to_string(),
            value: payload,
            expiry: now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)),
            last_updated: now,
            feedback_id: origin.map(str::to_string),
        };

        if let Err(e) = self.store.put_item(item).await {
            warn!("Error setting cache item {}: {}", key, e);
        }
    }

    /// Delete a key; absent keys are fine
    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.store.delete_item(key).await {
            warn!("Error deleting cache item {}: {}", key, e);
        }
    }

    /// Delete every item in the table, page by page
    ///
    /// Keys the store leaves unprocessed are resubmitted with a short backoff
    /// before the scan moves on. Returns the number of items deleted; stops at
    /// the first failed request.
    pub async fn clear(&self) -> usize {
        let mut deleted = 0;
        let mut start = None;

        loop {
            let page = match self.store.scan_keys(start.take()).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Error scanning cache table: {}", e);
                    break;
                }
            };

            match self.delete_keys(page.keys).await {
                Ok(count) => deleted += count,
                Err(count) => {
                    deleted += count;
                    break;
                }
            }

            match page.last_evaluated_key {
                Some(next) => start = Some(next),
                None => break,
            }
        }

        debug!("Deleted {} items from cache table", deleted);
        deleted
    }

    /// Delete one page of keys, resubmitting whatever comes back unprocessed
    ///
    /// `Err` carries the count deleted before the page had to be abandoned.
    async fn delete_keys(&self, keys: Vec<CacheKey>) -> std::result::Result<usize, usize> {
        let mut pending = keys;
        let mut deleted = 0;
        let mut resubmits = 0;

        while !pending.is_empty() {
            let unprocessed = match self.store.batch_delete(&pending).await {
                Ok(unprocessed) => unprocessed,
                Err(e) => {
                    warn!("Error clearing cache table: {}", e);
                    return Err(deleted);
                }
            };
            deleted += pending.len().saturating_sub(unprocessed.len());

            if unprocessed.is_empty() {
                break;
            }
            if resubmits >= UNPROCESSED_RESUBMIT_LIMIT {
                warn!(
                    "{} cache items still unprocessed after {} resubmissions",
                    unprocessed.len(),
                    resubmits
                );
                return Err(deleted);
            }

            resubmits += 1;
            debug!(
                "Resubmitting {} unprocessed deletes (attempt {})",
                unprocessed.len(),
                resubmits
            );
            tokio::time::sleep(Duration::from_millis(25 << resubmits)).await;
            pending = unprocessed;
        }

        Ok(deleted)
    }

    /// Live records written with the given origin
    pub async fn find_by_origin(&self, origin: &str) -> Vec<CachedRecord> {
        let items = match self.store.query_origin(origin).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Error querying cache by origin {}: {}", origin, e);
                return Vec::new();
            }
        };

        let now = Utc::now().timestamp();
        items
            .into_iter()
            .filter(|item| !item.is_expired_at(now))
            .filter_map(|item| match serde_json::from_str(&item.value) {
                Ok(value) => Some(CachedRecord {
                    key: item.cache_key,
                    value,
                    origin: item.feedback_id,
                }),
                Err(e) => {
                    warn!("Skipping corrupt payload for {}: {}", item.cache_key, e);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamodb::ScanPage;
    use crate::error::CacheError;
    use async_trait::async_trait;
    use serde_json::json;

    /// Store whose every call fails
    struct UnreachableStore;

    #[async_trait]
    impl ItemStore for UnreachableStore {
        async fn get_item(&self, _key: &str) -> Result<Option<CacheItem>> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn put_item(&self, _item: CacheItem) -> Result<()> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn delete_item(&self, _key: &str) -> Result<()> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn scan_keys(&self, _start: Option<String>) -> Result<ScanPage> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn batch_delete(&self, _keys: &[String]) -> Result<Vec<String>> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn query_origin(&self, _origin: &str) -> Result<Vec<CacheItem>> {
            Err(CacheError::Backend("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_open() {
        let cache = PersistentCache::new(Arc::new(UnreachableStore));

        cache
            .set("k", &json!({"a": 1}), Duration::from_secs(60), None)
            .await;
        assert!(cache.get("k").await.is_none());
        cache.delete("k").await;
        assert_eq!(cache.clear().await, 0);
        assert!(cache.find_by_origin("fb-1").await.is_empty());
    }
}
