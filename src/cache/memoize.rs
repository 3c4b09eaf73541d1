//! Memoization of expensive producers
//!
//! A memoized call runs its producer at most once per distinct argument set
//! per TTL window. Anything the producer does besides returning its value
//! (logging, metrics, calls to the model provider) is skipped on a cache hit.
//!
//! ```no_run
//! use compass_cache::{CacheConfig, CacheManager, CallArgs};
//!
//! # async fn embed(_text: &str) -> anyhow::Result<Vec<f32>> { Ok(vec![]) }
//! # async fn example() -> anyhow::Result<()> {
//! let cache = CacheManager::new(CacheConfig::from_env()?).await;
//! let text = "Senior engineer, 8 years, distributed systems";
//!
//! // embed() only runs when this text has not been embedded within the TTL
//! let vector: Vec<f32> = cache
//!     .cache_embedding(None)
//!     .call(CallArgs::new().arg(text), || embed(text))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::cache::{key::CallArgs, manager::CacheManager, types::Namespace};
use crate::error::CacheError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// A producer wrapper bound to one namespace
pub struct Memoized<'a> {
    manager: &'a CacheManager,
    namespace: Namespace,
    ttl: Option<Duration>,
}

impl CacheManager {
    /// Memoize producers under `namespace` with its configured TTL
    pub fn memoize(&self, namespace: Namespace) -> Memoized<'_> {
        Memoized {
            manager: self,
            namespace,
            ttl: None,
        }
    }

    /// Embedding generation
    pub fn cache_embedding(&self, ttl: Option<Duration>) -> Memoized<'_> {
        self.memoize(Namespace::Embedding).with_ttl(ttl)
    }

    /// Employee-to-role matching
    pub fn cache_role_matching(&self, ttl: Option<Duration>) -> Memoized<'_> {
        self.memoize(Namespace::RoleMatch).with_ttl(ttl)
    }

    /// Leadership potential scoring
    pub fn cache_leadership_score(&self, ttl: Option<Duration>) -> Memoized<'_> {
        self.memoize(Namespace::Leadership).with_ttl(ttl)
    }

    /// Career roadmap simulation
    pub fn cache_career_roadmap(&self, ttl: Option<Duration>) -> Memoized<'_> {
        self.memoize(Namespace::Roadmap).with_ttl(ttl)
    }

    /// Match narratives
    pub fn cache_narrative(&self, ttl: Option<Duration>) -> Memoized<'_> {
        self.memoize(Namespace::Narrative).with_ttl(ttl)
    }

    /// Assistant responses
    pub fn cache_ai_response(&self, ttl: Option<Duration>) -> Memoized<'_> {
        self.memoize(Namespace::AiResponse).with_ttl(ttl)
    }
}

impl<'a> Memoized<'a> {
    /// Override the namespace TTL (`None` keeps the configured default)
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Return the cached result for `args`, or run `producer` and cache it
    ///
    /// Only a key-generation failure is added to the producer's own errors;
    /// cache reads and writes that fail are logged and skipped. Producer
    /// errors are returned as-is and never cached.
    ///
    /// A cached value that no longer deserializes into `T` is deleted and
    /// recomputed. The backend has already counted that read as a hit, so
    /// each such entry adds one hit to the stats before it is dropped.
    pub async fn call<T, E, F, Fut>(&self, args: CallArgs, producer: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = args.key()?;
        let short_key = &key[..key.len().min(16)];

        if let Some(cached) = self.manager.get(self.namespace, &key).await {
            match T::deserialize(&*cached) {
                Ok(value) => {
                    debug!("Cache HIT for {}: {}...", self.namespace, short_key);
                    return Ok(value);
                }
                Err(e) => {
                    warn!(
                        "Cached {} entry {} does not match the expected type, recomputing: {}",
                        self.namespace, short_key, e
                    );
                    self.manager.delete(self.namespace, &key).await;
                }
            }
        } else {
            debug!("Cache MISS for {}: {}...", self.namespace, short_key);
        }

        let result = producer().await?;

        match serde_json::to_value(&result) {
            Ok(value) => {
                let ttl = self
                    .ttl
                    .unwrap_or_else(|| self.manager.config().ttl_with_jitter(self.namespace));
                self.manager
                    .set(self.namespace, &key, value, Some(ttl))
                    .await;
            }
            Err(e) => {
                warn!("Result for {} is not cacheable: {}", self.namespace, e);
            }
        }

        Ok(result)
    }
}
