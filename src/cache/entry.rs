//! Cache entry management with TTL support

use crate::cache::types::CacheValue;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A stored value with its expiry and recency bookkeeping
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Namespace the entry was stored under
    pub namespace: String,

    /// The cached value
    pub value: CacheValue,

    /// When the entry was stored
    pub created_at: DateTime<Utc>,

    /// When the entry expires (`None` = never)
    pub expires_at: Option<DateTime<Utc>>,

    /// Number of hits served from this entry
    pub access_count: u64,

    /// Position in the recency order (higher = more recent)
    pub(crate) tick: u64,
}

impl CacheEntry {
    /// Create a new entry expiring `ttl` after `now`
    pub fn new(namespace: &str, value: CacheValue, ttl: Option<Duration>, now: DateTime<Utc>) -> Self {
        // A TTL too large to represent is treated as no expiry
        let expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| now.checked_add_signed(ttl));

        Self {
            namespace: namespace.to_string(),
            value,
            created_at: now,
            expires_at,
            access_count: 0,
            tick: 0,
        }
    }

    /// Check if the entry has expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if now > expires_at)
    }

    /// Get time until expiration
    pub fn time_until_expiration(&self, now: DateTime<Utc>) -> Option<Duration> {
        let expires_at = self.expires_at?;
        if now > expires_at {
            None
        } else {
            (expires_at - now).to_std().ok()
        }
    }
}
