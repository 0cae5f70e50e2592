//! Cache store abstraction.
//!
//! A store holds opaque payloads under logical keys with a per-entry TTL.
//! Every failure is a [`CacheError`], distinct from a miss (`Ok(None)`).
//!
//! Each key also carries an invalidation generation. `delete` advances it, and
//! `set_if_generation` only writes while it is still the value the reader saw
//! before loading. A populate that raced an invalidation is dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation `{op}` timed out after {timeout_ms} ms")]
    Timeout { op: &'static str, timeout_ms: u64 },
    #[error("cache payload codec failed: {0}")]
    Codec(#[from] serde_json::Error),
}

impl CacheError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::Unavailable(_) => "unavailable",
            CacheError::Timeout { .. } => "timeout",
            CacheError::Codec(_) => "codec",
        }
    }
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Current invalidation generation of `key`. Never-invalidated keys are at 0.
    async fn generation(&self, key: &str) -> Result<u64, CacheError>;

    /// Write `value` only if `key` is still at `generation`. Returns `false`
    /// when the generation has moved on and the write was dropped.
    async fn set_if_generation(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        generation: u64,
    ) -> Result<bool, CacheError>;

    /// Remove every key in one call and advance each key's generation.
    /// Missing keys are not an error.
    async fn delete(&self, keys: &[&str]) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;

    fn backend(&self) -> &'static str;
}

/// Store used when caching is disabled: every read misses and writes vanish.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCacheStore;

#[async_trait]
impl CacheStore for NullCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn generation(&self, _key: &str) -> Result<u64, CacheError> {
        Ok(0)
    }

    async fn set_if_generation(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _ttl: Duration,
        _generation: u64,
    ) -> Result<bool, CacheError> {
        Ok(true)
    }

    async fn delete(&self, _keys: &[&str]) -> Result<(), CacheError> {
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "disabled"
    }
}

/// Wraps a store so no operation waits longer than `timeout`.
pub struct BoundedCacheStore {
    inner: Arc<dyn CacheStore>,
    timeout: Duration,
}

impl BoundedCacheStore {
    pub fn new(inner: Arc<dyn CacheStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, op: &'static str, future: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>> + Send,
    {
        match tokio::time::timeout(self.timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                op,
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

#[async_trait]
impl CacheStore for BoundedCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.bounded("get", self.inner.get(key)).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.bounded("set", self.inner.set(key, value, ttl)).await
    }

    async fn generation(&self, key: &str) -> Result<u64, CacheError> {
        self.bounded("generation", self.inner.generation(key)).await
    }

    async fn set_if_generation(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        generation: u64,
    ) -> Result<bool, CacheError> {
        self.bounded(
            "set",
            self.inner.set_if_generation(key, value, ttl, generation),
        )
        .await
    }

    async fn delete(&self, keys: &[&str]) -> Result<(), CacheError> {
        self.bounded("delete", self.inner.delete(keys)).await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.bounded("ping", self.inner.ping()).await
    }

    fn backend(&self) -> &'static str {
        self.inner.backend()
    }
}
