//! Post-write invalidation of derived cache keys.

use std::sync::Arc;

use metrics::counter;
use tracing::{info, warn};

use crate::domain::types::Collection;

use super::keys::{CacheKey, dependent_keys};
use super::store::{CacheError, CacheStore};

pub(crate) const METRIC_CACHE_INVALIDATION_FAILED: &str = "agora_cache_invalidation_failed_total";

/// Deletes every key derived from a collection once a write has committed.
///
/// Failures are reported, counted and returned, but never retried: TTL expiry
/// bounds how long a missed delete can serve stale data.
#[derive(Clone)]
pub struct InvalidationCoordinator {
    store: Arc<dyn CacheStore>,
}

impl InvalidationCoordinator {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub async fn invalidate(&self, collection: Collection) -> Result<(), CacheError> {
        self.delete_keys(dependent_keys(collection), collection.as_str())
            .await
    }

    /// Drop every well-known key. Used by the operator purge.
    pub async fn invalidate_all(&self) -> Result<(), CacheError> {
        self.delete_keys(&CacheKey::ALL, "all").await
    }

    async fn delete_keys(&self, keys: &[CacheKey], scope: &'static str) -> Result<(), CacheError> {
        let names: Vec<&str> = keys.iter().map(|key| key.as_str()).collect();
        match self.store.delete(&names).await {
            Ok(()) => {
                info!(scope, keys = ?names, "Invalidated cache keys");
                Ok(())
            }
            Err(err) => {
                counter!(METRIC_CACHE_INVALIDATION_FAILED, "scope" => scope).increment(1);
                warn!(
                    scope,
                    keys = ?names,
                    backend = self.store.backend(),
                    error_kind = err.kind(),
                    error = %err,
                    "Cache invalidation failed; entries expire by TTL"
                );
                Err(err)
            }
        }
    }
}
