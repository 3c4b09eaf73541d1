//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Cache key type - a hex digest for memoized calls, or a readable entity key
pub type CacheKey = String;

/// Cache value type - a shared, immutable JSON payload
///
/// The in-memory backend hands out clones of the `Arc`, not deep copies.
pub type CacheValue = Arc<serde_json::Value>;

/// Partition of the keyspace by producer category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Embedding vectors of profile and role text
    Embedding,

    /// Employee-to-role match results
    RoleMatch,

    /// Leadership potential scores
    Leadership,

    /// Career roadmap simulations
    Roadmap,

    /// Generated match narratives
    Narrative,

    /// Free-form assistant responses
    AiResponse,
}

impl Namespace {
    /// Every namespace, in declaration order
    pub const ALL: [Namespace; 6] = [
        Namespace::Embedding,
        Namespace::RoleMatch,
        Namespace::Leadership,
        Namespace::Roadmap,
        Namespace::Narrative,
        Namespace::AiResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Embedding => "embedding",
            Namespace::RoleMatch => "role_match",
            Namespace::Leadership => "leadership",
            Namespace::Roadmap => "roadmap",
            Namespace::Narrative => "narrative",
            Namespace::AiResponse => "ai_response",
        }
    }

    /// Environment variable overriding this namespace's TTL
    pub fn ttl_env_var(&self) -> String {
        format!("CACHE_TTL_{}", self.as_str().to_ascii_uppercase())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Namespace::ALL
            .iter()
            .find(|ns| ns.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown cache namespace: {}", s))
    }
}

/// Which storage technology backs the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Remote,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::Remote => write!(f, "remote"),
        }
    }
}

/// Statistics and metrics for cache performance monitoring
///
/// Hit and miss counts are reported by every backend; the optional fields are
/// backend-specific and left out of the serialized form when absent.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CacheStats {
    /// Total number of cache hits
    pub hits: u64,

    /// Total number of cache misses (absent or expired)
    pub misses: u64,

    /// Number of entries currently stored
    pub size: usize,

    /// Capacity bound (memory backend)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<usize>,

    /// Entries evicted by the LRU policy (memory backend)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evictions: Option<u64>,

    /// Entries dropped because their TTL elapsed (memory backend)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expirations: Option<u64>,

    /// Whether the remote store answered the stats query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,

    /// Human-readable memory usage reported by the remote store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_memory: Option<String>,

    /// Error raised while collecting remote stats
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Total number of lookups (hits + misses)
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, size: {}, evictions: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.size,
            self.evictions.unwrap_or(0)
        )
    }
}
