//! In-memory backend with LRU eviction and lazy TTL expiry

use crate::cache::{
    backend::{physical_key, CacheBackend},
    clock::{Clock, SystemClock},
    entry::CacheEntry,
    types::{CacheStats, CacheValue},
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Bounded, thread-safe LRU cache with per-entry TTL
///
/// Every operation takes the single store lock, so reads and writes of the same
/// key are serialized. When a `set` pushes the entry count above the capacity,
/// exactly one least-recently-used entry is evicted. Expired entries are dropped
/// lazily on the `get` that finds them, or by [`MemoryBackend::cleanup_expired`].
pub struct MemoryBackend {
    max_entries: usize,
    clock: Arc<dyn Clock>,
    store: RwLock<LruStore>,
}

/// Internal cache storage
#[derive(Default)]
struct LruStore {
    /// Physical key -> entry
    entries: HashMap<String, CacheEntry>,

    /// Recency order: tick -> physical key (first = least recently used)
    recency: BTreeMap<u64, String>,

    last_tick: u64,

    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl LruStore {
    fn next_tick(&mut self) -> u64 {
        self.last_tick += 1;
        self.last_tick
    }

    /// Insert or overwrite at the most-recently-used position
    fn insert(&mut self, key: String, mut entry: CacheEntry) {
        entry.tick = self.next_tick();
        self.recency.insert(entry.tick, key.clone());
        if let Some(old) = self.entries.insert(key, entry) {
            self.recency.remove(&old.tick);
        }
    }

    /// Mark an entry as used and return its value
    fn touch(&mut self, key: &str) -> Option<CacheValue> {
        let tick = self.next_tick();
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.tick);
        entry.tick = tick;
        entry.access_count += 1;
        self.recency.insert(tick, key.to_string());
        Some(entry.value.clone())
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.tick);
        Some(entry)
    }

    fn evict_lru(&mut self) -> Option<String> {
        let (_, key) = self.recency.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }
}

impl MemoryBackend {
    /// Create a backend holding at most `max_entries` entries
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, Arc::new(SystemClock))
    }

    /// Create a backend reading time from `clock`
    pub fn with_clock(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        info!("Initializing in-memory cache (max entries: {})", max_entries);

        Self {
            max_entries: max_entries.max(1),
            clock,
            store: RwLock::new(LruStore::default()),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Get number of entries in cache
    pub async fn len(&self) -> usize {
        self.store.read().await.entries.len()
    }

    /// Check if cache is empty
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.entries.is_empty()
    }

    /// Check for a live entry without touching recency or counters
    pub async fn contains(&self, namespace: &str, key: &str) -> bool {
        let now = self.clock.now();
        let store = self.store.read().await;
        store
            .entries
            .get(&physical_key(namespace, key))
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Remove all expired entries, returning how many were dropped
    pub async fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut store = self.store.write().await;

        let expired_keys: Vec<String> = store
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            store.remove(key);
        }
        store.expirations += expired_keys.len() as u64;

        if !expired_keys.is_empty() {
            debug!("Cleaned up {} expired entries", expired_keys.len());
        }
        expired_keys.len()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, namespace: &str, key: &str) -> Option<CacheValue> {
        let cache_key = physical_key(namespace, key);
        let now = self.clock.now();
        let mut store = self.store.write().await;

        match store.entries.get(&cache_key).map(|entry| entry.is_expired(now)) {
            None => {
                debug!("Cache miss: {}", cache_key);
                store.misses += 1;
                None
            }
            Some(true) => {
                debug!("Cache entry expired: {}", cache_key);
                store.remove(&cache_key);
                store.misses += 1;
                store.expirations += 1;
                None
            }
            Some(false) => {
                debug!("Cache hit: {}", cache_key);
                store.hits += 1;
                store.touch(&cache_key)
            }
        }
    }

    async fn set(&self, namespace: &str, key: &str, value: CacheValue, ttl: Option<Duration>) {
        let cache_key = physical_key(namespace, key);
        let entry = CacheEntry::new(namespace, value, ttl, self.clock.now());
        let mut store = self.store.write().await;

        store.insert(cache_key, entry);

        if store.entries.len() > self.max_entries {
            if let Some(evicted) = store.evict_lru() {
                debug!("Evicting least recently used entry: {}", evicted);
                store.evictions += 1;
            }
        }
    }

    async fn delete(&self, namespace: &str, key: &str) {
        let cache_key = physical_key(namespace, key);
        if self.store.write().await.remove(&cache_key).is_some() {
            debug!("Removed cache entry: {}", cache_key);
        }
    }

    async fn clear(&self, namespace: Option<&str>) {
        let mut store = self.store.write().await;

        match namespace {
            Some(ns) => {
                let keys: Vec<String> = store
                    .entries
                    .iter()
                    .filter(|(_, entry)| entry.namespace == ns)
                    .map(|(key, _)| key.clone())
                    .collect();
                for key in &keys {
                    store.remove(key);
                }
                info!("Cleared {} entries from namespace {}", keys.len(), ns);
            }
            None => {
                let count = store.entries.len();
                store.entries.clear();
                store.recency.clear();
                info!("Cleared {} entries from cache", count);
            }
        }
    }

    async fn stats(&self) -> CacheStats {
        let store = self.store.read().await;
        CacheStats {
            hits: store.hits,
            misses: store.misses,
            size: store.entries.len(),
            max_size: Some(self.max_entries),
            evictions: Some(store.evictions),
            expirations: Some(store.expirations),
            ..Default::default()
        }
    }

    async fn reset_stats(&self) {
        let mut store = self.store.write().await;
        store.hits = 0;
        store.misses = 0;
        store.evictions = 0;
        store.expirations = 0;
    }
}

/// Spawn a task sweeping expired entries every `interval`
pub fn spawn_cleanup_task(backend: Arc<MemoryBackend>, interval: Duration) -> JoinHandle<()> {
    info!("Starting automatic cache cleanup task (interval: {:?})", interval);

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let removed = backend.cleanup_expired().await;
            if removed > 0 {
                debug!("Auto cleanup removed {} entries", removed);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use serde_json::json;

    fn value(v: serde_json::Value) -> CacheValue {
        Arc::new(v)
    }

    fn backend_with_clock(max_entries: usize) -> (MemoryBackend, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (MemoryBackend::with_clock(max_entries, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_basic_set_and_get() {
        let cache = MemoryBackend::new(100);

        cache.set("embedding", "k1", value(json!([0.1, 0.2, 0.3])), None).await;

        let hit = cache.get("embedding", "k1").await;
        assert_eq!(hit.as_deref(), Some(&json!([0.1, 0.2, 0.3])));

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let cache = MemoryBackend::new(100);

        assert!(cache.get("embedding", "nonexistent").await.is_none());
        assert_eq!(cache.stats().await.misses, 1);
    }

    #[tokio::test]
    async fn test_hit_returns_shared_value() {
        let cache = MemoryBackend::new(10);
        let stored = value(json!({"score": 0.8}));

        cache.set("leadership", "e1", stored.clone(), None).await;
        let hit = cache.get("leadership", "e1").await.unwrap();

        assert!(Arc::ptr_eq(&stored, &hit));
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let (cache, clock) = backend_with_clock(10);

        cache
            .set("embedding", "k1", value(json!(1)), Some(Duration::from_secs(1)))
            .await;
        assert!(cache.get("embedding", "k1").await.is_some());

        clock.advance(Duration::from_millis(1100));

        assert!(cache.get("embedding", "k1").await.is_none());
        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, Some(1));
        // expired entry is purged on that read
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_no_ttl_never_expires() {
        let (cache, clock) = backend_with_clock(10);

        cache.set("ns", "k", value(json!("forever")), None).await;
        clock.advance(Duration::from_secs(365 * 24 * 3600));

        assert!(cache.get("ns", "k").await.is_some());
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache = MemoryBackend::new(2);

        cache.set("ns", "a", value(json!(1)), None).await;
        cache.set("ns", "b", value(json!(2)), None).await;
        assert!(cache.get("ns", "a").await.is_some());
        cache.set("ns", "c", value(json!(3)), None).await;

        assert!(cache.contains("ns", "a").await);
        assert!(!cache.contains("ns", "b").await);
        assert!(cache.contains("ns", "c").await);
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.stats().await.evictions, Some(1));
    }

    #[tokio::test]
    async fn test_eviction_without_access_removes_oldest() {
        let cache = MemoryBackend::new(3);

        for key in ["k1", "k2", "k3", "k4"] {
            cache.set("ns", key, value(json!(key)), None).await;
        }

        assert!(!cache.contains("ns", "k1").await);
        for key in ["k2", "k3", "k4"] {
            assert!(cache.contains("ns", key).await);
        }
        assert_eq!(cache.stats().await.evictions, Some(1));
    }

    #[tokio::test]
    async fn test_overwrite_does_not_evict() {
        let cache = MemoryBackend::new(2);

        cache.set("ns", "a", value(json!(1)), None).await;
        cache.set("ns", "b", value(json!(2)), None).await;
        cache.set("ns", "a", value(json!(10)), None).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.stats().await.evictions, Some(0));
        assert_eq!(cache.get("ns", "a").await.as_deref(), Some(&json!(10)));

        // overwriting moved "a" to the front, so "b" goes next
        cache.set("ns", "c", value(json!(3)), None).await;
        assert!(!cache.contains("ns", "b").await);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let cache = MemoryBackend::new(10);

        cache.set("ns", "k", value(json!(1)), None).await;
        cache.delete("ns", "k").await;
        cache.delete("ns", "k").await;
        cache.delete("ns", "never-existed").await;

        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear_namespace_is_isolated() {
        let cache = MemoryBackend::new(10);

        cache.set("role_match", "m1", value(json!(1)), None).await;
        cache.set("role_match", "m2", value(json!(2)), None).await;
        cache.set("embedding", "e1", value(json!(3)), None).await;
        cache.set("role_match_v2", "m1", value(json!(4)), None).await;

        cache.clear(Some("role_match")).await;

        assert!(!cache.contains("role_match", "m1").await);
        assert!(!cache.contains("role_match", "m2").await);
        assert!(cache.contains("embedding", "e1").await);
        assert!(cache.contains("role_match_v2", "m1").await);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let cache = MemoryBackend::new(10);

        cache.set("a", "1", value(json!(1)), None).await;
        cache.set("b", "2", value(json!(2)), None).await;
        cache.clear(None).await;

        assert_eq!(cache.len().await, 0);

        // recency order was reset too: filling to capacity evicts nothing
        for i in 0..10 {
            cache.set("a", &i.to_string(), value(json!(i)), None).await;
        }
        assert_eq!(cache.stats().await.evictions, Some(0));
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let (cache, clock) = backend_with_clock(10);

        cache
            .set("ns", "short", value(json!(1)), Some(Duration::from_secs(5)))
            .await;
        cache
            .set("ns", "long", value(json!(2)), Some(Duration::from_secs(500)))
            .await;

        clock.advance(Duration::from_secs(10));

        assert_eq!(cache.cleanup_expired().await, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.contains("ns", "long").await);
        assert_eq!(cache.stats().await.expirations, Some(1));
    }

    #[tokio::test]
    async fn test_stats_and_reset() {
        let cache = MemoryBackend::new(1);

        cache.set("ns", "k1", value(json!(1)), None).await;
        cache.set("ns", "k2", value(json!(2)), None).await;
        cache.get("ns", "k2").await;
        cache.get("ns", "k1").await;

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.max_size, Some(1));
        assert_eq!(stats.evictions, Some(1));
        assert_eq!(stats.hit_rate(), 50.0);

        cache.reset_stats().await;
        let stats = cache.stats().await;
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, Some(0));
        assert_eq!(stats.size, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_access() {
        let cache = Arc::new(MemoryBackend::new(1000));

        let mut handles = Vec::new();
        for task in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    let key = format!("{}-{}", task, i);
                    cache.set("ns", &key, Arc::new(json!(i)), None).await;
                    assert!(cache.get("ns", &key).await.is_some());
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = cache.stats().await;
        assert_eq!(stats.size, 800);
        assert_eq!(stats.hits, 800);
    }

    #[tokio::test]
    async fn test_auto_cleanup_task() {
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(MemoryBackend::with_clock(10, clock.clone()));

        cache
            .set("ns", "k", value(json!(1)), Some(Duration::from_secs(1)))
            .await;
        clock.advance(Duration::from_secs(2));

        let handle = spawn_cleanup_task(cache.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(cache.is_empty().await);
    }
}
