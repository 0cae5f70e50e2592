//! Agora cache layer.
//!
//! Collection snapshots are read cache-aside through a shared [`CacheStore`]
//! and deleted after every committed write. Expiry per key is configured in
//! `[cache.ttl]`:
//!
//! ```toml
//! [cache]
//! backend = "redis"
//! redis_url = "redis://127.0.0.1:6379"
//!
//! [cache.ttl]
//! events_seconds = 3600
//! analytics_seconds = 600
//! ```

mod accessor;
mod config;
mod invalidation;
mod keys;
mod memory;
mod store;

pub use accessor::CacheAside;
pub use config::CacheConfig;
pub use invalidation::InvalidationCoordinator;
pub use keys::{CacheKey, dependent_keys};
pub use memory::MemoryCacheStore;
pub use store::{BoundedCacheStore, CacheError, CacheStore, NullCacheStore};
