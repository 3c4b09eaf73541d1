//! Redis-backed cache shared between service instances
//!
//! Physical keys are `"<prefix>:<namespace>:<key>"`. Values travel as a
//! versioned JSON envelope, `{"v":1,"value":...}`, so processes built from
//! different releases can detect payloads they do not understand. TTLs are
//! delegated to Redis (`SET .. PX`).
//!
//! Failures after a successful handshake never reach the caller: reads degrade
//! to misses and writes to no-ops, both logged.

use crate::cache::{
    backend::CacheBackend,
    config::RemoteConfig,
    types::{CacheStats, CacheValue},
};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Version tag of the stored envelope
pub const WIRE_VERSION: u32 = 1;

/// Keys fetched per SCAN round trip when clearing
const SCAN_BATCH: usize = 500;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    v: u32,
    value: &'a Value,
}

#[derive(Deserialize)]
struct Envelope {
    v: u32,
    value: Value,
}

/// Encode a value for storage
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&EnvelopeRef {
        v: WIRE_VERSION,
        value,
    })?)
}

/// Decode a stored value, rejecting unknown envelope versions
pub fn decode_value(bytes: &[u8]) -> Result<Value> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;
    if envelope.v != WIRE_VERSION {
        return Err(CacheError::SerializationError(format!(
            "unsupported envelope version {} (expected {})",
            envelope.v, WIRE_VERSION
        )));
    }
    Ok(envelope.value)
}

/// Escape glob metacharacters for a SCAN MATCH pattern
fn escape_glob(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Pull `used_memory_human` out of an `INFO memory` reply
fn parse_used_memory(info: &str) -> Option<String> {
    info.lines()
        .find_map(|line| line.strip_prefix("used_memory_human:"))
        .map(|v| v.trim().to_string())
}

/// Cache backend on a shared Redis instance
pub struct RedisBackend {
    conn: ConnectionManager,
    key_prefix: String,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RedisBackend {
    /// Connect and verify the store answers `PING` within `connect_timeout`
    pub async fn connect(config: &RemoteConfig) -> Result<Self> {
        info!(
            "Connecting to Redis at {}:{} (db: {})",
            config.host, config.port, config.db
        );

        let client = redis::Client::open(config.url().as_str())?;
        let handshake = async {
            let mut conn = ConnectionManager::new(client).await?;
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(conn)
        };

        let conn = tokio::time::timeout(config.connect_timeout, handshake)
            .await
            .map_err(|_| CacheError::TimeoutError {
                timeout_ms: config.connect_timeout.as_millis() as u64,
                context: format!("connecting to redis at {}:{}", config.host, config.port),
            })?
            .map_err(|e| CacheError::ConnectionError(e.to_string()))?;

        info!("Successfully connected to Redis");

        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Physical key for a namespaced entry
    pub fn physical_key(&self, namespace: &str, key: &str) -> String {
        format!("{}:{}:{}", self.key_prefix, namespace, key)
    }

    /// Round-trip a `PING`
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn try_get(&self, cache_key: &str) -> Result<Option<Value>> {
        let mut conn = self.conn.clone();
        let bytes: Option<Vec<u8>> = redis::cmd("GET")
            .arg(cache_key)
            .query_async(&mut conn)
            .await?;

        bytes.map(|b| decode_value(&b)).transpose()
    }

    async fn try_set(&self, cache_key: &str, bytes: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(cache_key).arg(bytes);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl.as_millis().max(1) as u64);
        }

        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn try_delete(&self, cache_key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(cache_key)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Delete every key matching `pattern` using incremental SCAN
    async fn delete_matching(&self, pattern: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut deleted = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let removed: usize = redis::cmd("DEL").arg(&keys).query_async(&mut conn).await?;
                deleted += removed;
            }

            if next == 0 {
                return Ok(deleted);
            }
            cursor = next;
        }
    }

    async fn try_stats(&self) -> Result<(usize, Option<String>)> {
        let mut conn = self.conn.clone();
        let size: usize = redis::cmd("DBSIZE").query_async(&mut conn).await?;
        let info: String = redis::cmd("INFO").arg("memory").query_async(&mut conn).await?;
        Ok((size, parse_used_memory(&info)))
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, namespace: &str, key: &str) -> Option<CacheValue> {
        let cache_key = self.physical_key(namespace, key);

        match self.try_get(&cache_key).await {
            Ok(Some(value)) => {
                debug!("Cache hit: {}", cache_key);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::new(value))
            }
            Ok(None) => {
                debug!("Cache miss: {}", cache_key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(CacheError::SerializationError(e)) => {
                warn!("Undecodable cache entry {}, treating as miss: {}", cache_key, e);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                error!("Redis get error for {}: {}", cache_key, e);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    async fn set(&self, namespace: &str, key: &str, value: CacheValue, ttl: Option<Duration>) {
        let cache_key = self.physical_key(namespace, key);

        let bytes = match encode_value(&value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping cache write for {}: {}", cache_key, e);
                return;
            }
        };

        if let Err(e) = self.try_set(&cache_key, bytes, ttl).await {
            error!("Redis set error for {}: {}", cache_key, e);
        }
    }

    async fn delete(&self, namespace: &str, key: &str) {
        let cache_key = self.physical_key(namespace, key);
        if let Err(e) = self.try_delete(&cache_key).await {
            error!("Redis delete error for {}: {}", cache_key, e);
        }
    }

    async fn clear(&self, namespace: Option<&str>) {
        // Only our own prefix is cleared; the store may hold unrelated data
        let pattern = match namespace {
            Some(ns) => format!("{}:{}:*", escape_glob(&self.key_prefix), escape_glob(ns)),
            None => format!("{}:*", escape_glob(&self.key_prefix)),
        };

        match self.delete_matching(&pattern).await {
            Ok(count) => info!("Cleared {} keys matching {}", count, pattern),
            Err(e) => error!("Redis clear error for {}: {}", pattern, e),
        }
    }

    async fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);

        match self.try_stats().await {
            Ok((size, used_memory)) => CacheStats {
                hits,
                misses,
                size,
                connected: Some(true),
                used_memory,
                ..Default::default()
            },
            Err(e) => CacheStats {
                hits,
                misses,
                connected: Some(false),
                error: Some(e.to_string()),
                ..Default::default()
            },
        }
    }

    async fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_format() {
        let bytes = encode_value(&json!([0.1, 0.2])).unwrap();
        assert_eq!(
            serde_json::from_slice::<Value>(&bytes).unwrap(),
            json!({"v": 1, "value": [0.1, 0.2]})
        );
        assert_eq!(decode_value(&bytes).unwrap(), json!([0.1, 0.2]));
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let err = decode_value(br#"{"v":2,"value":1}"#).unwrap_err();
        assert!(matches!(err, CacheError::SerializationError(_)));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_value(b"\x80\x04pickle"),
            Err(CacheError::SerializationError(_))
        ));
    }

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("compass"), "compass");
        assert_eq!(escape_glob("a*b?[c]"), "a\\*b\\?\\[c\\]");
    }

    #[test]
    fn test_parse_used_memory() {
        let info = "# Memory\r\nused_memory:1048576\r\nused_memory_human:1.00M\r\n";
        assert_eq!(parse_used_memory(info).as_deref(), Some("1.00M"));
        assert!(parse_used_memory("# Memory\r\n").is_none());
    }

    #[tokio::test]
    async fn test_connect_unreachable_fails() {
        let config = RemoteConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout: Duration::from_millis(300),
            ..Default::default()
        };

        let result = RedisBackend::connect(&config).await;
        assert!(matches!(
            result,
            Err(CacheError::ConnectionError(_)) | Err(CacheError::TimeoutError { .. })
        ));
    }
}
