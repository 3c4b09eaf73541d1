//! Cache manager: owns the single backend chosen at startup

use crate::cache::{
    backend::CacheBackend,
    config::CacheConfig,
    remote::RedisBackend,
    store::{spawn_cleanup_task, MemoryBackend},
    types::{BackendKind, CacheStats, CacheValue, Namespace},
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Uniform façade over the active backend
///
/// Constructed once by the process bootstrap and passed (usually behind an
/// `Arc`) to whatever needs caching. The backend choice is fixed for the
/// lifetime of the manager.
pub struct CacheManager {
    config: CacheConfig,
    backend: Arc<dyn CacheBackend>,
    kind: BackendKind,
    cleanup_task: Option<JoinHandle<()>>,
}

/// Observability snapshot for a health/metrics endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CacheReport {
    #[serde(rename = "type")]
    pub backend: BackendKind,

    #[serde(flatten)]
    pub stats: CacheStats,

    /// Hit rate as a percentage
    pub hit_rate: f64,

    pub config: ConfigSummary,
}

/// The parts of the configuration worth exposing
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub requested_backend: BackendKind,
    pub remote_host: Option<String>,
    pub memory_max_size: usize,
    pub ttl_seconds: BTreeMap<Namespace, u64>,
    pub cache_warming_enabled: bool,
}

impl CacheManager {
    /// Select a backend from `config`
    ///
    /// When the remote backend is requested but cannot be reached, the manager
    /// logs the downgrade and uses the in-memory backend instead. Construction
    /// never fails.
    pub async fn new(config: CacheConfig) -> Self {
        if let Err(e) = config.validate() {
            warn!("Cache configuration is invalid, continuing with it anyway: {}", e);
        }

        if config.use_remote {
            match RedisBackend::connect(&config.remote).await {
                Ok(backend) => {
                    info!("Cache initialized with backend: remote");
                    return Self::with_backend(config, Arc::new(backend), BackendKind::Remote);
                }
                Err(e) => {
                    warn!("Failed to initialize Redis cache, falling back to in-memory: {}", e);
                }
            }
        }

        let memory = Arc::new(MemoryBackend::new(config.memory_max_entries));
        let cleanup_task = config
            .enable_auto_cleanup
            .then(|| spawn_cleanup_task(memory.clone(), config.cleanup_interval));

        info!("Cache initialized with backend: memory");
        Self {
            config,
            backend: memory,
            kind: BackendKind::Memory,
            cleanup_task,
        }
    }

    /// In-memory manager without any remote attempt or background sweep
    pub fn in_memory(config: CacheConfig) -> Self {
        let backend = Arc::new(MemoryBackend::new(config.memory_max_entries));
        Self::with_backend(config, backend, BackendKind::Memory)
    }

    /// Manager over an explicitly constructed backend
    pub fn with_backend(config: CacheConfig, backend: Arc<dyn CacheBackend>, kind: BackendKind) -> Self {
        Self {
            config,
            backend,
            kind,
            cleanup_task: None,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    pub async fn get(&self, namespace: Namespace, key: &str) -> Option<CacheValue> {
        self.backend.get(namespace.as_str(), key).await
    }

    pub async fn set(
        &self,
        namespace: Namespace,
        key: &str,
        value: impl Into<CacheValue>,
        ttl: Option<Duration>,
    ) {
        self.backend
            .set(namespace.as_str(), key, value.into(), ttl)
            .await
    }

    pub async fn delete(&self, namespace: Namespace, key: &str) {
        self.backend.delete(namespace.as_str(), key).await
    }

    /// Clear one namespace, or everything
    pub async fn clear(&self, namespace: Option<Namespace>) {
        self.backend.clear(namespace.map(|ns| ns.as_str())).await
    }

    pub async fn stats(&self) -> CacheStats {
        self.backend.stats().await
    }

    pub async fn reset_stats(&self) {
        self.backend.reset_stats().await
    }

    /// Backend type, merged stats and configuration summary
    pub async fn report(&self) -> CacheReport {
        let stats = self.stats().await;
        let requested_backend = if self.config.use_remote {
            BackendKind::Remote
        } else {
            BackendKind::Memory
        };

        CacheReport {
            backend: self.kind,
            hit_rate: stats.hit_rate(),
            stats,
            config: ConfigSummary {
                requested_backend,
                remote_host: self
                    .config
                    .use_remote
                    .then(|| format!("{}:{}", self.config.remote.host, self.config.remote.port)),
                memory_max_size: self.config.memory_max_entries,
                ttl_seconds: Namespace::ALL
                    .iter()
                    .map(|ns| (*ns, self.config.ttl_for(*ns).as_secs()))
                    .collect(),
                cache_warming_enabled: self.config.enable_warming,
            },
        }
    }
}

impl Drop for CacheManager {
    fn drop(&mut self) {
        if let Some(task) = self.cleanup_task.take() {
            task.abort();
        }
    }
}
