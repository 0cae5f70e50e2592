//! Process-local cache store.
//!
//! LRU-bounded with lazy expiry: an entry past its deadline is dropped on the
//! next `get`. Deadlines use the tokio clock so paused-time tests can advance
//! past a TTL deterministically. Generations sit under the same mutex as the
//! entries, so a conditional set cannot interleave with a delete.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use tokio::time::Instant;

use crate::util::lock::mutex_lock;

use super::store::{CacheError, CacheStore};

const SOURCE: &str = "cache::memory";

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

struct Inner {
    entries: LruCache<String, Entry>,
    generations: HashMap<String, u64>,
}

impl Inner {
    fn generation(&self, key: &str) -> u64 {
        self.generations.get(key).copied().unwrap_or(0)
    }
}

pub struct MemoryCacheStore {
    inner: Mutex<Inner>,
}

impl MemoryCacheStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                generations: HashMap::new(),
            }),
        }
    }

    /// Number of physically present entries, expired or not.
    pub fn len(&self) -> usize {
        mutex_lock(&self.inner, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut inner = mutex_lock(&self.inner, SOURCE, "get");
        let expired = match inner.entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
        };
        if expired {
            inner.entries.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now() + ttl;
        mutex_lock(&self.inner, SOURCE, "set")
            .entries
            .put(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn generation(&self, key: &str) -> Result<u64, CacheError> {
        Ok(mutex_lock(&self.inner, SOURCE, "generation").generation(key))
    }

    async fn set_if_generation(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        generation: u64,
    ) -> Result<bool, CacheError> {
        let mut inner = mutex_lock(&self.inner, SOURCE, "set_if_generation");
        if inner.generation(key) != generation {
            return Ok(false);
        }
        let expires_at = Instant::now() + ttl;
        inner
            .entries
            .put(key.to_string(), Entry { value, expires_at });
        Ok(true)
    }

    async fn delete(&self, keys: &[&str]) -> Result<(), CacheError> {
        let mut inner = mutex_lock(&self.inner, SOURCE, "delete");
        for key in keys {
            inner.entries.pop(*key);
            *inner.generations.entry((*key).to_string()).or_insert(0) += 1;
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(capacity: usize) -> MemoryCacheStore {
        MemoryCacheStore::new(NonZeroUsize::new(capacity).expect("non-zero"))
    }

    #[tokio::test]
    async fn get_returns_what_was_set() {
        let cache = store(4);
        cache
            .set("events:all", b"[1]".to_vec(), Duration::from_secs(60))
            .await
            .expect("set");
        assert_eq!(
            cache.get("events:all").await.expect("get"),
            Some(b"[1]".to_vec())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_read_as_absent_and_are_dropped() {
        let cache = store(4);
        cache
            .set("analytics:summary", b"{}".to_vec(), Duration::from_secs(10))
            .await
            .expect("set");

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(cache.get("analytics:summary").await.expect("get").is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("analytics:summary").await.expect("get").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_all_listed_keys() {
        let cache = store(4);
        let ttl = Duration::from_secs(60);
        cache.set("events:all", vec![1], ttl).await.expect("set");
        cache.set("locations:all", vec![2], ttl).await.expect("set");
        cache.set("analytics:summary", vec![3], ttl).await.expect("set");

        cache
            .delete(&["events:all", "analytics:summary", "missing"])
            .await
            .expect("delete");

        assert!(cache.get("events:all").await.expect("get").is_none());
        assert!(cache.get("analytics:summary").await.expect("get").is_none());
        assert_eq!(cache.get("locations:all").await.expect("get"), Some(vec![2]));
    }

    #[tokio::test]
    async fn delete_advances_generation_and_rejects_stale_set() {
        let cache = store(4);
        let ttl = Duration::from_secs(60);
        let seen = cache.generation("events:all").await.expect("generation");
        assert_eq!(seen, 0);

        cache.delete(&["events:all"]).await.expect("delete");
        assert_eq!(cache.generation("events:all").await.expect("generation"), 1);

        let written = cache
            .set_if_generation("events:all", b"[\"old\"]".to_vec(), ttl, seen)
            .await
            .expect("set");
        assert!(!written);
        assert!(cache.get("events:all").await.expect("get").is_none());

        let written = cache
            .set_if_generation("events:all", b"[\"new\"]".to_vec(), ttl, 1)
            .await
            .expect("set");
        assert!(written);
        assert_eq!(
            cache.get("events:all").await.expect("get"),
            Some(b"[\"new\"]".to_vec())
        );
    }

    #[tokio::test]
    async fn eviction_keeps_generation() {
        let cache = store(1);
        let ttl = Duration::from_secs(60);
        cache.delete(&["a"]).await.expect("delete");
        cache.set("a", vec![1], ttl).await.expect("set");
        cache.set("b", vec![2], ttl).await.expect("set");

        assert!(cache.get("a").await.expect("get").is_none());
        assert_eq!(cache.generation("a").await.expect("generation"), 1);
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let cache = store(2);
        let ttl = Duration::from_secs(60);
        cache.set("a", vec![1], ttl).await.expect("set");
        cache.set("b", vec![2], ttl).await.expect("set");
        cache.get("a").await.expect("get");
        cache.set("c", vec![3], ttl).await.expect("set");

        assert!(cache.get("b").await.expect("get").is_none());
        assert!(cache.get("a").await.expect("get").is_some());
        assert_eq!(cache.len(), 2);
    }
}
