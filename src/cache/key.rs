//! Deterministic cache keys
//!
//! Memoized calls are keyed by a digest of their canonicalized arguments. The
//! canonical form sorts mapping keys at every depth and keyword arguments by
//! name, so insertion order never changes the key. Digests are the first 128
//! bits of SHA-256, hex-encoded.

use crate::cache::{finite::ensure_finite, types::CacheKey};
use crate::error::{CacheError, Result};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Digest length in bytes (128 bits)
const DIGEST_BYTES: usize = 16;

/// Arguments of one logical call, collected for key generation
///
/// Canonicalization errors are recorded and reported by [`CallArgs::key`],
/// so the builder chain stays infallible.
///
/// ```
/// use compass_cache::CallArgs;
///
/// let key = CallArgs::new()
///     .arg("emp-042")
///     .kwarg("top_k", &5)
///     .key()
///     .unwrap();
/// assert_eq!(key.len(), 32);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    positional: Vec<Value>,
    keyword: BTreeMap<String, Value>,
    error: Option<String>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument
    pub fn arg<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        if self.error.is_none() {
            match to_canonical_value(value) {
                Ok(v) => self.positional.push(v),
                Err(e) => {
                    self.error = Some(format!(
                        "positional argument {} cannot be canonicalized: {}",
                        self.positional.len(),
                        e
                    ))
                }
            }
        }
        self
    }

    /// Set a keyword argument (a repeated name replaces the earlier value)
    pub fn kwarg<T: Serialize + ?Sized>(mut self, name: &str, value: &T) -> Self {
        if self.error.is_none() {
            match to_canonical_value(value) {
                Ok(v) => {
                    self.keyword.insert(name.to_string(), v);
                }
                Err(e) => {
                    self.error = Some(format!(
                        "keyword argument {:?} cannot be canonicalized: {}",
                        name, e
                    ))
                }
            }
        }
        self
    }

    /// Canonical text the key is derived from
    pub fn canonical_text(&self) -> Result<String> {
        match &self.error {
            Some(e) => Err(CacheError::KeyGeneration(e.clone())),
            None => Ok(canonical_text(&self.positional, &self.keyword)),
        }
    }

    /// Digest key for these arguments
    pub fn key(&self) -> Result<CacheKey> {
        self.canonical_text().map(|text| digest(&text))
    }
}

/// Convert an argument, refusing floats JSON cannot represent
fn to_canonical_value<T: Serialize + ?Sized>(value: &T) -> std::result::Result<Value, String> {
    ensure_finite(value).map_err(|e| e.to_string())?;
    serde_json::to_value(value).map_err(|e| e.to_string())
}

/// Generate a key from already-canonicalizable arguments
pub fn generate_key(positional: &[Value], keyword: &BTreeMap<String, Value>) -> CacheKey {
    digest(&canonical_text(positional, keyword))
}

fn canonical_text(positional: &[Value], keyword: &BTreeMap<String, Value>) -> String {
    let mut parts = Vec::with_capacity(positional.len() + keyword.len());

    for value in positional {
        let mut part = String::new();
        write_canonical(value, &mut part);
        parts.push(part);
    }

    // BTreeMap iterates in name order
    for (name, value) in keyword {
        let mut part = format!("{}=", name);
        write_canonical(value, &mut part);
        parts.push(part);
    }

    parts.join("|")
}

/// Compact JSON with object keys sorted at every depth
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn digest(text: &str) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..DIGEST_BYTES])
}

/// Readable, unhashed key for entity-scoped operations
///
/// Produces `"<entity>:<operation>:k1=v1:k2=v2"` with parameters sorted by name.
pub struct CacheKeyBuilder {
    identifier: String,
    operation: String,
    params: BTreeMap<String, String>,
}

impl CacheKeyBuilder {
    /// Key for an operation on one employee
    pub fn employee(employee_id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            identifier: employee_id.into(),
            operation: operation.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter to the key
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// Build the cache key
    pub fn build(self) -> CacheKey {
        let mut parts = vec![self.identifier, self.operation];
        parts.extend(self.params.into_iter().map(|(k, v)| format!("{}={}", k, v)));
        parts.join(":")
    }
}
