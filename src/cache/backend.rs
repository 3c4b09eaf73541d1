//! Storage backend contract

use crate::cache::types::{CacheStats, CacheValue};
use async_trait::async_trait;
use std::time::Duration;

/// Contract every storage technology implements
///
/// Operations never fail at this boundary: an implementation that talks to
/// something fallible logs the failure and degrades (a miss for `get`, a no-op
/// for writes) so callers can always proceed without the cache.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Look up a key; `None` when absent or expired
    async fn get(&self, namespace: &str, key: &str) -> Option<CacheValue>;

    /// Store a value, replacing any existing entry; `ttl = None` means no expiry
    async fn set(&self, namespace: &str, key: &str, value: CacheValue, ttl: Option<Duration>);

    /// Remove a key; absent keys are ignored
    async fn delete(&self, namespace: &str, key: &str);

    /// Remove one namespace, or everything when `namespace` is `None`
    async fn clear(&self, namespace: Option<&str>);

    /// Current counters and backend-specific details
    async fn stats(&self) -> CacheStats;

    /// Zero the hit/miss/eviction counters
    async fn reset_stats(&self);
}

/// Physical key for a namespaced entry
pub fn physical_key(namespace: &str, key: &str) -> String {
    format!("{}:{}", namespace, key)
}
