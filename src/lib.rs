//! # Compass Cache (compass-cache)
//!
//! Result caching for the talent-intelligence backend: the expensive
//! computations (embedding generation, role matching, leadership scoring,
//! career roadmaps, narratives and assistant responses) are memoized behind a
//! single [`CacheManager`].
//!
//! ## Features
//!
//! - Async-first design using tokio
//! - In-memory LRU backend with per-entry TTL
//! - Optional Redis backend shared across service instances
//! - Automatic fallback to memory when Redis is unreachable
//! - Per-namespace TTLs configured from the environment
//! - Hit/miss/eviction statistics for a health endpoint
//!
//! ## Memoizing a producer
//!
//! ```no_run
//! use compass_cache::{CacheConfig, CacheManager, CallArgs};
//!
//! # async fn score(_employee_id: &str) -> compass_cache::Result<f64> { Ok(0.8) }
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = CacheManager::new(CacheConfig::from_env()?).await;
//!
//!     let potential: f64 = cache
//!         .cache_leadership_score(None)
//!         .call(CallArgs::new().arg("emp-042"), || score("emp-042"))
//!         .await?;
//!
//!     println!("Leadership potential: {}", potential);
//!     Ok(())
//! }
//! ```
//!
//! ## Invalidation
//!
//! Keys are argument digests, so an update to one employee clears every
//! namespace that could depend on it:
//!
//! ```no_run
//! use compass_cache::{CacheConfig, CacheManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = CacheManager::new(CacheConfig::from_env()?).await;
//!
//!     let event = cache.invalidate_employee("emp-042").await;
//!     println!("Cleared {:?} ({})", event.namespaces, event.reason);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;

// Re-export main types for convenience
pub use cache::{
    generate_key, BackendKind, CacheBackend, CacheConfig, CacheConfigBuilder, CacheEntry,
    CacheKey, CacheKeyBuilder, CacheManager, CacheReport, CacheStats, CacheValue, CallArgs,
    InvalidationEvent, InvalidationReason, Memoized, MemoryBackend, Namespace, RedisBackend,
    RemoteConfig, WarmingReport,
};
pub use error::{CacheError, Result};
