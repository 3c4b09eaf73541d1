//! # Result Caching Layer
//!
//! Caches the results of expensive, mostly-deterministic computations
//! (embeddings, role matching, leadership scoring, roadmap simulation,
//! generated text) so repeated requests with the same inputs skip the work.
//!
//! ## Features
//!
//! - **Deterministic Keys**: argument digests independent of map ordering
//! - **Namespaces**: one keyspace and one TTL per producer category
//! - **Two Backends**: bounded in-memory LRU, or a shared Redis instance
//! - **Graceful Degradation**: an unreachable Redis falls back to memory, and
//!   remote I/O failures become misses
//! - **Memoization**: per-namespace wrappers around async producers
//! - **Invalidation & Warming**: namespace clears on data changes, and eager
//!   population for known-hot inputs
//!
//! ## Example
//!
//! ```no_run
//! use compass_cache::cache::{CacheConfig, CacheManager, Namespace};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = CacheConfig::builder()
//!     .memory_max_entries(10_000)
//!     .ttl(Namespace::AiResponse, Duration::from_secs(600))
//!     .build();
//!
//! let cache = CacheManager::new(config).await;
//!
//! cache.set(Namespace::AiResponse, "greeting", json!("hello"), None).await;
//!
//! if let Some(value) = cache.get(Namespace::AiResponse, "greeting").await {
//!     println!("Cache hit: {}", value);
//! }
//!
//! println!("{}", serde_json::to_string_pretty(&cache.report().await)?);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod clock;
pub mod config;
pub mod entry;
mod finite;
pub mod invalidation;
pub mod key;
pub mod manager;
pub mod memoize;
pub mod remote;
pub mod store;
pub mod types;
pub mod warming;

pub use backend::CacheBackend;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, CacheConfigBuilder, RemoteConfig};
pub use entry::CacheEntry;
pub use invalidation::{InvalidationEvent, InvalidationReason};
pub use key::{generate_key, CacheKeyBuilder, CallArgs};
pub use manager::{CacheManager, CacheReport, ConfigSummary};
pub use memoize::Memoized;
pub use remote::RedisBackend;
pub use store::{spawn_cleanup_task, MemoryBackend};
pub use types::{BackendKind, CacheKey, CacheStats, CacheValue, Namespace};
pub use warming::WarmingReport;
