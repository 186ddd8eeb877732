//! Uniform cache facade with hit/miss/set accounting

use crate::cache::{
    config::{CacheConfig, CacheType},
    memory::{Lookup, MemoryStore},
    persistent::PersistentCache,
    types::{CacheKey, CacheMetrics, CacheValue, CachedRecord},
};
use crate::error::Result;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Storage behind a `CacheManager`, chosen once at construction
pub enum CacheBackend {
    InMemory(MemoryStore),
    Persistent(PersistentCache),
}

impl CacheBackend {
    pub fn kind(&self) -> CacheType {
        match self {
            CacheBackend::InMemory(_) => CacheType::Memory,
            CacheBackend::Persistent(_) => CacheType::Persistent,
        }
    }
}

/// Cache entry point for the orchestrator
///
/// Owns its backend and its metrics. Share it as `Arc<CacheManager>`; every
/// method takes `&self`.
pub struct CacheManager {
    backend: CacheBackend,
    ttl: Duration,
    metrics: RwLock<CacheMetrics>,
}

impl CacheManager {
    /// Construct the backend described by `config`
    ///
    /// Fails on invalid configuration. A persistent backend is created without
    /// contacting the table, so an unreachable store does not fail here.
    pub async fn from_config(config: &CacheConfig) -> Result<Self> {
        config.validate()?;

        let backend = match config.cache_type {
            CacheType::Memory => CacheBackend::InMemory(MemoryStore::new()),
            CacheType::Persistent => {
                CacheBackend::Persistent(PersistentCache::connect(&config.dynamodb).await?)
            }
        };

        Ok(Self::with_backend(backend, config.ttl))
    }

    /// In-memory manager with the given TTL
    pub fn in_memory(ttl: Duration) -> Self {
        Self::with_backend(CacheBackend::InMemory(MemoryStore::new()), ttl)
    }

    /// Manager over an existing persistent backend
    pub fn persistent(cache: PersistentCache, ttl: Duration) -> Self {
        Self::with_backend(CacheBackend::Persistent(cache), ttl)
    }

    fn with_backend(backend: CacheBackend, ttl: Duration) -> Self {
        info!(
            "Initializing {} cache (ttl: {}s)",
            backend.kind(),
            ttl.as_secs()
        );

        Self {
            backend,
            ttl,
            metrics: RwLock::new(CacheMetrics::default()),
        }
    }

    pub fn backend_kind(&self) -> CacheType {
        self.backend.kind()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live value
    pub async fn get(&self, key: &str) -> Option<CacheValue> {
        debug!("Cache get request for key: {}", key);

        let value = match &self.backend {
            CacheBackend::InMemory(store) => match store.lookup(key).await {
                Lookup::Hit(value) => Some(value),
                Lookup::Expired => {
                    info!("Cache entry expired for key: {}", key);
                    None
                }
                Lookup::Missing => None,
            },
            CacheBackend::Persistent(cache) => cache.get(key).await,
        };

        let mut metrics = self.metrics.write().await;
        if value.is_some() {
            metrics.hits += 1;
            info!("Cache hit for key: {}", key);
        } else {
            metrics.misses += 1;
            info!("Cache miss for key: {}", key);
        }

        value
    }

    /// Store a value for the configured TTL
    pub async fn set(&self, key: impl Into<CacheKey>, value: CacheValue) {
        self.set_with_origin(key, value, None).await;
    }

    /// Store a value tagged with the id of the request that produced it
    pub async fn set_with_origin(
        &self,
        key: impl Into<CacheKey>,
        value: CacheValue,
        origin: Option<&str>,
    ) {
        let key = key.into();
        debug!("Cache set request for key: {}", key);

        match &self.backend {
            CacheBackend::InMemory(store) => {
                store
                    .insert(key.clone(), value, self.ttl, origin.map(str::to_string))
                    .await
            }
            CacheBackend::Persistent(cache) => cache.set(&key, &value, self.ttl, origin).await,
        }

        self.metrics.write().await.sets += 1;
        info!("Cache set for key: {}", key);
    }

    /// Remove a key if present
    pub async fn delete(&self, key: &str) {
        debug!("Cache delete request for key: {}", key);

        match &self.backend {
            CacheBackend::InMemory(store) => {
                if store.remove(key).await {
                    info!("Cache entry deleted for key: {}", key);
                } else {
                    debug!("Cache entry not found for delete key: {}", key);
                }
            }
            CacheBackend::Persistent(cache) => {
                cache.delete(key).await;
                info!("Cache entry deleted for key: {}", key);
            }
        }
    }

    /// Remove every entry and reset the metrics
    pub async fn clear(&self) {
        let removed = match &self.backend {
            CacheBackend::InMemory(store) => store.clear().await,
            CacheBackend::Persistent(cache) => cache.clear().await,
        };

        *self.metrics.write().await = CacheMetrics::default();
        info!("Cleared {} entries from {} cache", removed, self.backend.kind());
    }

    /// Snapshot of the counters
    pub async fn get_metrics(&self) -> CacheMetrics {
        *self.metrics.read().await
    }

    /// Live entries recorded with the given origin
    pub async fn find_by_origin(&self, origin: &str) -> Vec<CachedRecord> {
        match &self.backend {
            CacheBackend::InMemory(store) => store.find_by_origin(origin).await,
            CacheBackend::Persistent(cache) => cache.find_by_origin(origin).await,
        }
    }

    /// Drop expired in-memory entries
    ///
    /// The persistent backend keeps expiry lazy and always returns 0.
    pub async fn purge_expired(&self) -> usize {
        match &self.backend {
            CacheBackend::InMemory(store) => {
                let purged = store.purge_expired().await;
                if purged > 0 {
                    debug!("Purged {} expired entries", purged);
                }
                purged
            }
            CacheBackend::Persistent(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = CacheManager::in_memory(Duration::from_secs(60));

        cache.set("key1", json!({"test": "data"})).await;
        assert_eq!(cache.get("key1").await, Some(json!({"test": "data"})));

        let metrics = cache.get_metrics().await;
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 0);
        assert_eq!(metrics.sets, 1);
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let cache = CacheManager::in_memory(Duration::from_secs(60));

        assert!(cache.get("nonexistent").await.is_none());
        assert_eq!(cache.get_metrics().await.misses, 1);
    }

    #[tokio::test]
    async fn test_reading_metrics_does_not_reset() {
        let cache = CacheManager::in_memory(Duration::from_secs(60));
        cache.get("a").await;

        assert_eq!(cache.get_metrics().await.misses, 1);
        assert_eq!(cache.get_metrics().await.misses, 1);
    }

    #[tokio::test]
    async fn test_delete_absent_key_is_noop() {
        let cache = CacheManager::in_memory(Duration::from_secs(60));
        cache.delete("never-set").await;

        assert_eq!(cache.get_metrics().await, CacheMetrics::default());
    }

    #[tokio::test]
    async fn test_from_config_selects_backend() {
        let config = CacheConfig::default();
        let cache = CacheManager::from_config(&config).await.unwrap();
        assert_eq!(cache.backend_kind(), CacheType::Memory);
        assert_eq!(cache.ttl(), Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_from_config_rejects_invalid() {
        let config = CacheConfig::builder().ttl(Duration::ZERO).build();
        assert!(CacheManager::from_config(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = CacheManager::in_memory(Duration::from_secs(1));
        cache.set("a", json!(1)).await;

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.purge_expired().await, 0);
    }

    #[tokio::test]
    async fn test_expired_lookup_counts_as_miss_and_is_removed() {
        let cache = CacheManager::in_memory(Duration::from_millis(50));
        cache.set("a", json!(1)).await;

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cache.get("a").await.is_none());
        assert_eq!(cache.get_metrics().await.misses, 1);
        if let CacheBackend::InMemory(store) = &cache.backend {
            assert!(store.is_empty().await);
        }
    }
}
