//! Configuration for the cache system
//!
//! All options are read once at startup. Defaults mirror the volatility of each
//! producer: embeddings of static profile text live for a day, conversational
//! responses for fifteen minutes.

use crate::cache::types::Namespace;
use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

/// Connection settings for the shared Redis store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,

    #[serde(skip_serializing, default)]
    pub password: Option<String>,

    /// Process-wide prefix keeping our keys apart from unrelated data
    pub key_prefix: String,

    /// Upper bound on connect + PING at startup
    pub connect_timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            password: None,
            key_prefix: "compass".to_string(),
            connect_timeout: Duration::from_millis(2000),
        }
    }
}

impl RemoteConfig {
    /// Connection URL understood by the redis client
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

/// Configuration for the cache manager and its backends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Select the Redis backend (falls back to memory if unreachable)
    pub use_remote: bool,

    /// Redis connection settings
    pub remote: RemoteConfig,

    /// Capacity bound of the in-memory LRU backend
    pub memory_max_entries: usize,

    /// Default time-to-live per namespace
    pub ttls: BTreeMap<Namespace, Duration>,

    /// TTL jitter factor (0.0 - 1.0) applied to namespace defaults
    /// Spreads expiry of entries written together to avoid recompute stampedes
    pub ttl_jitter: f64,

    /// Allow `CacheManager::warm` to run producers eagerly
    pub enable_warming: bool,

    /// Periodically sweep expired entries from the memory backend
    pub enable_auto_cleanup: bool,

    /// Interval for automatic cleanup sweeps
    pub cleanup_interval: Duration,
}

/// Default TTL for a namespace
pub fn default_ttl(namespace: Namespace) -> Duration {
    match namespace {
        Namespace::Embedding => Duration::from_secs(24 * 3600),
        Namespace::RoleMatch => Duration::from_secs(3600),
        Namespace::Leadership => Duration::from_secs(2 * 3600),
        Namespace::Roadmap => Duration::from_secs(3600),
        Namespace::Narrative => Duration::from_secs(1800),
        Namespace::AiResponse => Duration::from_secs(900),
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            use_remote: false,
            remote: RemoteConfig::default(),
            memory_max_entries: 1000,
            ttls: Namespace::ALL
                .iter()
                .map(|ns| (*ns, default_ttl(*ns)))
                .collect(),
            ttl_jitter: 0.0,
            enable_warming: false,
            enable_auto_cleanup: false,
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Load configuration from the process environment (and `.env`, if present)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("USE_REDIS_CACHE") {
            config.use_remote = parse_bool("USE_REDIS_CACHE", &v)?;
        }
        if let Some(v) = lookup("REDIS_HOST") {
            config.remote.host = v;
        }
        if let Some(v) = lookup("REDIS_PORT") {
            config.remote.port = parse_num("REDIS_PORT", &v)?;
        }
        if let Some(v) = lookup("REDIS_DB") {
            config.remote.db = parse_num("REDIS_DB", &v)?;
        }
        if let Some(v) = lookup("REDIS_PASSWORD") {
            config.remote.password = Some(v).filter(|p| !p.is_empty());
        }
        if let Some(v) = lookup("REDIS_KEY_PREFIX") {
            config.remote.key_prefix = v;
        }
        if let Some(v) = lookup("REDIS_CONNECT_TIMEOUT_MS") {
            config.remote.connect_timeout =
                Duration::from_millis(parse_num("REDIS_CONNECT_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = lookup("MEMORY_CACHE_MAX_SIZE") {
            config.memory_max_entries = parse_num("MEMORY_CACHE_MAX_SIZE", &v)?;
        }
        for ns in Namespace::ALL {
            let var = ns.ttl_env_var();
            if let Some(v) = lookup(&var) {
                config
                    .ttls
                    .insert(ns, Duration::from_secs(parse_num(&var, &v)?));
            }
        }
        if let Some(v) = lookup("CACHE_TTL_JITTER") {
            config.ttl_jitter = parse_num("CACHE_TTL_JITTER", &v)?;
        }
        if let Some(v) = lookup("ENABLE_CACHE_WARMING") {
            config.enable_warming = parse_bool("ENABLE_CACHE_WARMING", &v)?;
        }
        if let Some(v) = lookup("ENABLE_CACHE_AUTO_CLEANUP") {
            config.enable_auto_cleanup = parse_bool("ENABLE_CACHE_AUTO_CLEANUP", &v)?;
        }
        if let Some(v) = lookup("CACHE_CLEANUP_INTERVAL") {
            config.cleanup_interval =
                Duration::from_secs(parse_num("CACHE_CLEANUP_INTERVAL", &v)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.memory_max_entries == 0 {
            return Err(CacheError::ConfigError(
                "memory_max_entries must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            return Err(CacheError::ConfigError(
                "ttl_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        if let Some((ns, _)) = self.ttls.iter().find(|(_, ttl)| ttl.is_zero()) {
            return Err(CacheError::ConfigError(format!(
                "TTL for namespace {} must be greater than 0",
                ns
            )));
        }

        Ok(())
    }

    /// Configured TTL for a namespace
    pub fn ttl_for(&self, namespace: Namespace) -> Duration {
        self.ttls
            .get(&namespace)
            .copied()
            .unwrap_or_else(|| default_ttl(namespace))
    }

    /// Namespace TTL with jitter applied
    pub fn ttl_with_jitter(&self, namespace: Namespace) -> Duration {
        let base = self.ttl_for(namespace);
        if self.ttl_jitter == 0.0 {
            return base;
        }

        let base_secs = base.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_secs = (base_secs + jitter).max(1.0);

        Duration::from_secs_f64(final_secs)
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(CacheError::ConfigError(format!(
            "{} must be a boolean, got {:?}",
            var, other
        ))),
    }
}

fn parse_num<T: FromStr>(var: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CacheError::ConfigError(format!("{} has an invalid value: {:?}", var, value))
    })
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    use_remote: Option<bool>,
    remote: Option<RemoteConfig>,
    memory_max_entries: Option<usize>,
    ttls: BTreeMap<Namespace, Duration>,
    ttl_jitter: Option<f64>,
    enable_warming: Option<bool>,
    enable_auto_cleanup: Option<bool>,
    cleanup_interval: Option<Duration>,
}

impl CacheConfigBuilder {
    /// Select the remote backend
    pub fn use_remote(mut self, enable: bool) -> Self {
        self.use_remote = Some(enable);
        self
    }

    /// Set Redis connection settings
    pub fn remote(mut self, remote: RemoteConfig) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Set the in-memory capacity bound
    pub fn memory_max_entries(mut self, max: usize) -> Self {
        self.memory_max_entries = Some(max);
        self
    }

    /// Override the TTL of one namespace
    pub fn ttl(mut self, namespace: Namespace, ttl: Duration) -> Self {
        self.ttls.insert(namespace, ttl);
        self
    }

    /// Set TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = Some(jitter);
        self
    }

    /// Enable or disable cache warming
    pub fn enable_warming(mut self, enable: bool) -> Self {
        self.enable_warming = Some(enable);
        self
    }

    /// Enable or disable automatic cleanup
    pub fn enable_auto_cleanup(mut self, enable: bool) -> Self {
        self.enable_auto_cleanup = Some(enable);
        self
    }

    /// Set cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();
        let mut ttls = defaults.ttls;
        ttls.extend(self.ttls);

        CacheConfig {
            use_remote: self.use_remote.unwrap_or(defaults.use_remote),
            remote: self.remote.unwrap_or(defaults.remote),
            memory_max_entries: self
                .memory_max_entries
                .unwrap_or(defaults.memory_max_entries),
            ttls,
            ttl_jitter: self.ttl_jitter.unwrap_or(defaults.ttl_jitter),
            enable_warming: self.enable_warming.unwrap_or(defaults.enable_warming),
            enable_auto_cleanup: self
                .enable_auto_cleanup
                .unwrap_or(defaults.enable_auto_cleanup),
            cleanup_interval: self.cleanup_interval.unwrap_or(defaults.cleanup_interval),
        }
    }
}
