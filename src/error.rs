//! Error types for cache operations
//!
//! Most failures inside the cache are absorbed and logged rather than returned:
//! a lost cache read or write must never fail the computation it wraps. The
//! variants here surface from construction helpers (`RedisBackend::connect`,
//! `CacheConfig::from_env`) and, for `KeyGeneration`, from memoized calls.

use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// An argument could not be canonicalized into a deterministic key
    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    /// Connection error - remote store unreachable or handshake failed
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Operation timeout
    #[error("Operation timed out after {timeout_ms}ms: {context}")]
    TimeoutError { timeout_ms: u64, context: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Redis driver error (wrapper)
    #[error("Redis driver error: {0}")]
    BackendError(#[from] redis::RedisError),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}
