//! Integration tests for the persistent backend
//!
//! The DynamoDB table is replaced by an in-process `ItemStore` that pages
//! scans and can be switched into a failing mode.

use async_trait::async_trait;
use chrono::Utc;
use feedback_cache::cache::{CacheManager, CacheMetrics, PersistentCache};
use feedback_cache::dynamodb::{CacheItem, ItemStore, ScanPage};
use feedback_cache::{CacheError, Result};
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Table stand-in with deterministic key order
struct FakeTable {
    items: Mutex<BTreeMap<String, CacheItem>>,
    page_size: usize,
    failing: AtomicBool,
    scans: AtomicUsize,
    deletes: AtomicUsize,
    /// Batch deletes that only process every other key
    throttled_batches: AtomicUsize,
    /// Keys batch deletes never process
    stuck: Mutex<HashSet<String>>,
    batch_calls: AtomicUsize,
}

impl FakeTable {
    fn new(page_size: usize) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(BTreeMap::new()),
            page_size,
            failing: AtomicBool::new(false),
            scans: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            throttled_batches: AtomicUsize::new(0),
            stuck: Mutex::new(HashSet::new()),
            batch_calls: AtomicUsize::new(0),
        })
    }

    fn throttle(&self, batches: usize) {
        self.throttled_batches.store(batches, Ordering::SeqCst);
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError::Backend("ProvisionedThroughputExceededException".to_string()))
        } else {
            Ok(())
        }
    }

    fn insert_raw(&self, item: CacheItem) {
        self.items.lock().unwrap().insert(item.cache_key.clone(), item);
    }

    fn raw(&self, key: &str) -> Option<CacheItem> {
        self.items.lock().unwrap().get(key).cloned()
    }

    fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

#[async_trait]
impl ItemStore for FakeTable {
    async fn get_item(&self, key: &str) -> Result<Option<CacheItem>> {
        self.check()?;
        Ok(self.raw(key))
    }

    async fn put_item(&self, item: CacheItem) -> Result<()> {
        self.check()?;
        self.insert_raw(item);
        Ok(())
    }

    async fn delete_item(&self, key: &str) -> Result<()> {
        self.check()?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.items.lock().unwrap().remove(key);
        Ok(())
    }

    async fn scan_keys(&self, start: Option<String>) -> Result<ScanPage> {
        self.check()?;
        self.scans.fetch_add(1, Ordering::SeqCst);

        let items = self.items.lock().unwrap();
        let keys: Vec<String> = items
            .keys()
            .filter(|k| start.as_ref().map_or(true, |s| *k > s))
            .take(self.page_size)
            .cloned()
            .collect();
        let more = keys
            .last()
            .map_or(false, |last| items.keys().any(|k| k > last));

        Ok(ScanPage {
            last_evaluated_key: if more { keys.last().cloned() } else { None },
            keys,
        })
    }

    async fn batch_delete(&self, keys: &[String]) -> Result<Vec<String>> {
        self.check()?;
        self.batch_calls.fetch_add(1, Ordering::SeqCst);

        let throttled = self
            .throttled_batches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        let stuck = self.stuck.lock().unwrap();
        let mut items = self.items.lock().unwrap();
        let mut unprocessed = Vec::new();
        for (i, key) in keys.iter().enumerate() {
            if (throttled && i % 2 == 1) || stuck.contains(key) {
                unprocessed.push(key.clone());
            } else {
                items.remove(key);
            }
        }
        Ok(unprocessed)
    }

    async fn query_origin(&self, origin: &str) -> Result<Vec<CacheItem>> {
        self.check()?;
        Ok(self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|item| item.feedback_id.as_deref() == Some(origin))
            .cloned()
            .collect())
    }
}

fn manager(table: &Arc<FakeTable>) -> CacheManager {
    let store: Arc<dyn ItemStore> = table.clone();
    CacheManager::persistent(PersistentCache::new(store), Duration::from_secs(3600))
}

#[tokio::test]
async fn test_set_writes_item_layout() {
    let table = FakeTable::new(10);
    let cache = manager(&table);

    let before = Utc::now().timestamp();
    cache
        .set_with_origin("abc", json!({"sentiment": "positive"}), Some("fb-001"))
        .await;

    let item = table.raw("abc").unwrap();
    assert_eq!(item.cache_key, "abc");
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&item.value).unwrap(),
        json!({"sentiment": "positive"})
    );
    assert!(item.expiry >= before + 3600);
    assert!(item.last_updated >= before);
    assert_eq!(item.feedback_id.as_deref(), Some("fb-001"));
}

#[tokio::test]
async fn test_scenario_against_table() {
    let table = FakeTable::new(10);
    let cache = manager(&table);

    cache.set("abc", json!({"sentiment": "positive"})).await;
    assert_eq!(
        cache.get("abc").await,
        Some(json!({"sentiment": "positive"}))
    );
    assert_eq!(cache.get_metrics().await.hits, 1);

    cache.delete("abc").await;
    assert!(cache.get("abc").await.is_none());
    assert_eq!(cache.get_metrics().await.misses, 1);
    assert_eq!(table.len(), 0);
}

#[tokio::test]
async fn test_expired_item_is_deleted_on_read() {
    let table = FakeTable::new(10);
    let cache = manager(&table);

    let now = Utc::now().timestamp();
    table.insert_raw(CacheItem {
        cache_key: "stale".to_string(),
        value: r#"{"a":1}"#.to_string(),
        expiry: now - 10,
        last_updated: now - 3610,
        feedback_id: None,
    });

    assert!(cache.get("stale").await.is_none());
    assert!(table.raw("stale").is_none());
    assert_eq!(cache.get_metrics().await.misses, 1);
}

#[tokio::test]
async fn test_corrupt_payload_is_deleted() {
    let table = FakeTable::new(10);
    let cache = manager(&table);

    table.insert_raw(CacheItem {
        cache_key: "broken".to_string(),
        value: "{not json".to_string(),
        expiry: Utc::now().timestamp() + 3600,
        last_updated: Utc::now().timestamp(),
        feedback_id: None,
    });

    assert!(cache.get("broken").await.is_none());
    assert!(table.raw("broken").is_none());
}

#[tokio::test]
async fn test_backend_failure_fails_open() {
    let table = FakeTable::new(10);
    let cache = manager(&table);

    cache.set("k", json!({"a": 1})).await;
    table.set_failing(true);

    assert!(cache.get("k").await.is_none());
    cache.set("k2", json!({"b": 2})).await;
    cache.delete("k").await;

    let metrics = cache.get_metrics().await;
    assert_eq!(metrics.misses, 1);
    assert_eq!(metrics.sets, 2);

    // The failure left no lasting damage
    table.set_failing(false);
    assert_eq!(cache.get("k").await, Some(json!({"a": 1})));
    assert!(table.raw("k2").is_none());
}

#[tokio::test]
async fn test_clear_paginates_whole_table() {
    let table = FakeTable::new(3);
    let cache = manager(&table);

    for i in 0..10 {
        cache.set(format!("key-{:02}", i), json!({"i": i})).await;
    }
    cache.get("key-00").await;

    cache.clear().await;

    assert_eq!(table.len(), 0);
    assert!(table.scans.load(Ordering::SeqCst) >= 4);
    assert_eq!(cache.get_metrics().await, CacheMetrics::default());
}

#[tokio::test]
async fn test_clear_resubmits_unprocessed_keys() {
    let table = FakeTable::new(10);
    let cache = manager(&table);

    for i in 0..4 {
        cache.set(format!("key-{}", i), json!({"i": i})).await;
    }
    table.throttle(1);

    cache.clear().await;

    assert_eq!(table.len(), 0);
    assert_eq!(table.batch_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_clear_gives_up_on_persistent_throttling() {
    let table = FakeTable::new(10);
    let cache = manager(&table);

    cache.set("a", json!(1)).await;
    cache.set("b", json!(2)).await;
    table.stuck.lock().unwrap().insert("b".to_string());

    cache.clear().await;

    // One call plus five resubmissions of "b"
    assert_eq!(table.len(), 1);
    assert!(table.raw("b").is_some());
    assert_eq!(table.batch_calls.load(Ordering::SeqCst), 6);
    assert_eq!(cache.get_metrics().await, CacheMetrics::default());
}

#[tokio::test]
async fn test_clear_on_empty_table() {
    let table = FakeTable::new(3);
    let cache = manager(&table);

    cache.clear().await;

    assert_eq!(table.scans.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get_metrics().await, CacheMetrics::default());
}

#[tokio::test]
async fn test_find_by_origin_skips_expired() {
    let table = FakeTable::new(10);
    let cache = manager(&table);

    cache
        .set_with_origin("live", json!({"n": 1}), Some("fb-7"))
        .await;
    let now = Utc::now().timestamp();
    table.insert_raw(CacheItem {
        cache_key: "dead".to_string(),
        value: r#"{"n":2}"#.to_string(),
        expiry: now - 1,
        last_updated: now - 100,
        feedback_id: Some("fb-7".to_string()),
    });

    let records = cache.find_by_origin("fb-7").await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, "live");
    assert_eq!(records[0].origin.as_deref(), Some("fb-7"));
}

#[tokio::test]
async fn test_persistent_purge_is_lazy() {
    let table = FakeTable::new(10);
    let cache = manager(&table);
    cache.set("k", json!(1)).await;

    assert_eq!(cache.purge_expired().await, 0);
    assert_eq!(table.len(), 1);
    assert_eq!(table.deletes.load(Ordering::SeqCst), 0);
}
