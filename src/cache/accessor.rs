//! Cache-aside reads.
//!
//! The accessor fails open: a down, slow or corrupt cache turns into a
//! durable-store read, never into an error for the caller.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::keys::CacheKey;
use super::store::{CacheError, CacheStore};

pub(crate) const METRIC_CACHE_HIT: &str = "agora_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "agora_cache_miss_total";
pub(crate) const METRIC_CACHE_UNAVAILABLE: &str = "agora_cache_unavailable_total";
pub(crate) const METRIC_CACHE_POPULATE_FAILED: &str = "agora_cache_populate_failed_total";

#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
}

enum Lookup<T> {
    Hit(T),
    Miss,
    Unavailable,
}

impl CacheAside {
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    /// Read `key` using its configured TTL.
    pub async fn read<T, E, F, Fut>(&self, key: CacheKey, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.read_through(key, self.config.ttl_for(key), loader).await
    }

    /// Return the cached value for `key`, or load, populate and return it.
    ///
    /// Loader errors propagate unchanged. Cache errors never do. When the
    /// lookup itself failed the store is treated as down for this request and
    /// the populate is skipped.
    pub async fn read_through<T, E, F, Fut>(
        &self,
        key: CacheKey,
        ttl: Duration,
        loader: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let lookup = self.lookup::<T>(key).await;
        let generation = match lookup {
            Lookup::Hit(value) => return Ok(value),
            Lookup::Miss => self.generation(key).await,
            Lookup::Unavailable => None,
        };

        let value = loader().await?;

        if let Some(generation) = generation {
            self.populate(key, ttl, &value, generation).await;
        }

        Ok(value)
    }

    /// Generation observed before the loader runs. An invalidation that lands
    /// while the loader is running moves it on and the populate is dropped.
    async fn generation(&self, key: CacheKey) -> Option<u64> {
        let cache_key = key.as_str();
        match self.store.generation(cache_key).await {
            Ok(generation) => Some(generation),
            Err(err) => {
                counter!(METRIC_CACHE_UNAVAILABLE, "key" => cache_key, "op" => "generation")
                    .increment(1);
                warn!(
                    cache_key,
                    backend = self.store.backend(),
                    error_kind = err.kind(),
                    error = %err,
                    "Cache unavailable; skipping populate"
                );
                None
            }
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: CacheKey) -> Lookup<T> {
        let cache_key = key.as_str();
        match self.store.get(cache_key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => {
                    counter!(METRIC_CACHE_HIT, "key" => cache_key).increment(1);
                    debug!(cache_key, "cache hit");
                    Lookup::Hit(value)
                }
                Err(err) => {
                    counter!(METRIC_CACHE_MISS, "key" => cache_key).increment(1);
                    warn!(
                        cache_key,
                        error = %CacheError::Codec(err),
                        "Discarding undecodable cache entry"
                    );
                    Lookup::Miss
                }
            },
            Ok(None) => {
                counter!(METRIC_CACHE_MISS, "key" => cache_key).increment(1);
                debug!(cache_key, "cache miss");
                Lookup::Miss
            }
            Err(err) => {
                counter!(METRIC_CACHE_UNAVAILABLE, "key" => cache_key, "op" => "get")
                    .increment(1);
                warn!(
                    cache_key,
                    backend = self.store.backend(),
                    error_kind = err.kind(),
                    error = %err,
                    "Cache unavailable; reading from durable store"
                );
                Lookup::Unavailable
            }
        }
    }

    async fn populate<T: Serialize>(
        &self,
        key: CacheKey,
        ttl: Duration,
        value: &T,
        generation: u64,
    ) {
        let cache_key = key.as_str();
        let result = match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.store
                    .set_if_generation(cache_key, bytes, ttl, generation)
                    .await
            }
            Err(err) => Err(CacheError::Codec(err)),
        };

        match result {
            Ok(true) => {}
            Ok(false) => {
                debug!(cache_key, generation, "Entry invalidated during load; not populating");
            }
            Err(err) => {
                counter!(METRIC_CACHE_POPULATE_FAILED, "key" => cache_key).increment(1);
                warn!(
                    cache_key,
                    backend = self.store.backend(),
                    error_kind = err.kind(),
                    error = %err,
                    "Failed to populate cache entry"
                );
            }
        }
    }
}
