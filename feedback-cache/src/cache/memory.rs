//! Process-local cache storage with lazy TTL expiry

use crate::cache::{
    entry::CacheEntry,
    types::{CacheKey, CacheValue, CachedRecord},
};
use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Outcome of a lookup in the memory store
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Live entry found
    Hit(CacheValue),
    /// Entry was present but dead; it has been removed
    Expired,
    /// No entry for the key
    Missing,
}

/// Map of live entries guarded by an async `RwLock`
///
/// Entries carry an absolute expiry. Nothing sweeps them in the background:
/// a dead entry is dropped by the lookup that finds it, or by `purge_expired`.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key, removing it if it has expired
    pub async fn lookup(&self, key: &str) -> Lookup {
        let mut entries = self.entries.write().await;

        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                debug!("Cache entry expired: {}", key);
                entries.remove(key);
                Lookup::Expired
            }
            Some(entry) => Lookup::Hit(entry.value.clone()),
            None => Lookup::Missing,
        }
    }

    /// Store a value, replacing any previous entry for the key
    pub async fn insert(
        &self,
        key: CacheKey,
        value: CacheValue,
        ttl: Duration,
        origin: Option<String>,
    ) {
        let entry = match origin {
            Some(origin) => CacheEntry::new(key.clone(), value, ttl).with_origin(origin),
            None => CacheEntry::new(key.clone(), value, ttl),
        };

        let mut entries = self.entries.write().await;
        if entries.insert(key.clone(), entry).is_some() {
            debug!("Replaced cache entry: {}", key);
        } else {
            debug!("Inserted cache entry: {}", key);
        }
    }

    /// Remove a key; returns whether it was present
    pub async fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.write().await;
        entries.remove(key).is_some()
    }

    /// Remove all entries; returns how many were dropped
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        count
    }

    /// Remove every expired entry; returns how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }

    /// Live entries recorded with the given origin
    pub async fn find_by_origin(&self, origin: &str) -> Vec<CachedRecord> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        entries
            .values()
            .filter(|entry| entry.origin.as_deref() == Some(origin) && !entry.is_expired_at(now))
            .map(|entry| CachedRecord {
                key: entry.key.clone(),
                value: entry.value.clone(),
                origin: entry.origin.clone(),
            })
            .collect()
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
