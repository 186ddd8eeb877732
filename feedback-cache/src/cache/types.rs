//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key type - a 64 character lowercase hex SHA-256 fingerprint
pub type CacheKey = String;

/// Cache value type - an arbitrary JSON result document
pub type CacheValue = serde_json::Value;

/// Hit/miss/set counters kept by a `CacheManager`
///
/// Counters only grow during the manager's lifetime; `clear()` is the
/// single operation that resets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CacheMetrics {
    /// Lookups that returned a live value
    pub hits: u64,

    /// Lookups that found nothing, an expired entry, or an unreadable one
    pub misses: u64,

    /// Number of `set` calls
    pub sets: u64,
}

impl CacheMetrics {
    /// Total number of lookups
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.lookups();
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for CacheMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheMetrics {{ hits: {}, misses: {}, sets: {}, hit_rate: {:.2}% }}",
            self.hits,
            self.misses,
            self.sets,
            self.hit_rate()
        )
    }
}

/// A live record returned by lookup-by-origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRecord {
    pub key: CacheKey,
    pub value: CacheValue,
    pub origin: Option<String>,
}
