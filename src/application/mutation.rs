//! Write path shared by every mutating service.
//!
//! Each mutation runs the durable write, then deletes the dependent cache
//! keys, then publishes the change. Only the write can fail the mutation.
//! A write that timed out is treated as possibly committed and still
//! invalidates.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::InvalidationCoordinator;
use crate::domain::types::Collection;
use crate::realtime::{Change, ChangePublisher};

use super::repos::RepoError;

pub struct MutationPipeline {
    invalidation: InvalidationCoordinator,
    publisher: Arc<dyn ChangePublisher>,
    store_timeout: Duration,
}

impl MutationPipeline {
    pub fn new(
        invalidation: InvalidationCoordinator,
        publisher: Arc<dyn ChangePublisher>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            invalidation,
            publisher,
            store_timeout,
        }
    }

    /// Run `write` against `collection`; on success invalidate and publish
    /// the change built from its result.
    ///
    /// A failed write returns before the cache or any viewer is touched. A
    /// timed-out write may still have committed, so the collection's keys are
    /// invalidated before the timeout is returned. Nothing is published for it.
    pub async fn apply<T, Fut, F>(
        &self,
        collection: Collection,
        write: Fut,
        to_change: F,
    ) -> Result<T, RepoError>
    where
        Fut: Future<Output = Result<T, RepoError>>,
        F: FnOnce(&T) -> Change,
    {
        let outcome = match tokio::time::timeout(self.store_timeout, write).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    collection = collection.as_str(),
                    timeout_ms = u64::try_from(self.store_timeout.as_millis()).unwrap_or(u64::MAX),
                    "Durable store write timed out"
                );
                Err(RepoError::Timeout)
            }
        };
        let value = match outcome {
            Ok(value) => value,
            Err(RepoError::Timeout) => {
                let invalidated = self.invalidation.invalidate(collection).await.is_ok();
                debug!(
                    collection = collection.as_str(),
                    invalidated, "Invalidated after write of unknown outcome"
                );
                return Err(RepoError::Timeout);
            }
            Err(err) => return Err(err),
        };

        let change = to_change(&value);
        debug_assert_eq!(change.collection, collection);
        let kind = change.kind.as_str();

        // Logged and counted by the coordinator; TTL covers a missed delete.
        let invalidated = self.invalidation.invalidate(collection).await.is_ok();

        match self.publisher.publish(change) {
            Ok(sequence) => debug!(
                collection = collection.as_str(),
                kind,
                sequence,
                invalidated,
                "Mutation committed"
            ),
            Err(err) => warn!(
                collection = collection.as_str(),
                kind,
                error = %err,
                "Failed to publish change event"
            ),
        }

        Ok(value)
    }
}
