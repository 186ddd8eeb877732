//! In-memory cache entry with absolute expiry

use crate::cache::types::{CacheKey, CacheValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cache entry held by the in-memory backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cache key
    pub key: CacheKey,

    /// The cached result document
    pub value: CacheValue,

    /// Correlation id of the request that produced the value
    pub origin: Option<String>,

    /// When the entry was written
    pub created_at: DateTime<Utc>,

    /// First instant at which the entry is dead
    pub expiry: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry that expires `ttl` after now
    pub fn new(key: CacheKey, value: CacheValue, ttl: Duration) -> Self {
        let now = Utc::now();
        let expiry = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            key,
            value,
            origin: None,
            created_at: now,
            expiry,
        }
    }

    /// Attach a correlation id
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check expiry against a given instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;

    #[test]
    fn test_cache_entry_creation() {
        let entry = CacheEntry::new(
            "test_key".to_string(),
            json!({"sentiment": "positive"}),
            Duration::from_secs(3600),
        );

        assert_eq!(entry.key, "test_key");
        assert_eq!(entry.value["sentiment"], "positive");
        assert!(entry.origin.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new("test".to_string(), json!(1), Duration::from_millis(100));

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(150));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiry_boundary_is_dead() {
        let expiry = Utc::now();
        let mut entry = CacheEntry::new("test".to_string(), json!(null), Duration::from_secs(60));
        entry.expiry = expiry;

        assert!(entry.is_expired_at(expiry));
        assert!(!entry.is_expired_at(expiry - chrono::Duration::milliseconds(1)));
    }

    #[test]
    fn test_with_origin() {
        let entry = CacheEntry::new("k".to_string(), json!({}), Duration::from_secs(60))
            .with_origin("fb-123");

        assert_eq!(entry.origin.as_deref(), Some("fb-123"));
    }

    #[test]
    fn test_unrepresentable_ttl_never_expires() {
        let entry = CacheEntry::new("k".to_string(), json!({}), Duration::MAX);

        assert_eq!(entry.expiry, DateTime::<Utc>::MAX_UTC);
        assert!(!entry.is_expired());
    }
}
