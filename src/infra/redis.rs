//! Redis-backed shared cache store.
//!
//! The connection is established on first use and re-established by
//! [`ConnectionManager`] after failures, so an unreachable Redis at startup
//! only degrades reads to the durable store.
//!
//! Each entry has a sibling generation counter. `DEL` and `INCR` run in one
//! `MULTI`, and the conditional populate compares the counter and writes the
//! entry in a single Lua script, so both are atomic on the server.

use std::time::Duration;

use async_trait::async_trait;
use redis::{Client, RedisError, Script, aio::ConnectionManager};
use tokio::sync::OnceCell;
use tracing::info;

use crate::cache::{CacheError, CacheStore};

const SET_IF_GENERATION: &str = r"
local current = redis.call('GET', KEYS[2]) or '0'
if current ~= ARGV[2] then
    return 0
end
redis.call('SET', KEYS[1], ARGV[1], 'PX', ARGV[3])
return 1
";

pub struct RedisCacheStore {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    key_prefix: String,
    set_if_generation: Script,
}

impl RedisCacheStore {
    pub fn new(url: &str, key_prefix: impl Into<String>) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(|err| unavailable("open", err))?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
            key_prefix: key_prefix.into(),
            set_if_generation: Script::new(SET_IF_GENERATION),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }

    fn generation_key(&self, key: &str) -> String {
        format!("{}generation:{key}", self.key_prefix)
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new(self.client.clone()).await?;
                info!(key_prefix = %self.key_prefix, "Connected to Redis cache");
                Ok::<_, RedisError>(manager)
            })
            .await
            .map_err(|err| unavailable("connect", err))?;
        Ok(manager.clone())
    }
}

/// Whole milliseconds for `PX`, never zero.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn unavailable(op: &str, err: RedisError) -> CacheError {
    CacheError::unavailable(format!("redis {op} failed: {err}"))
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(self.namespaced(key))
            .query_async(&mut conn)
            .await
            .map_err(|err| unavailable("GET", err))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let () = redis::cmd("SET")
            .arg(self.namespaced(key))
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|err| unavailable("SET", err))?;
        Ok(())
    }

    async fn generation(&self, key: &str) -> Result<u64, CacheError> {
        let mut conn = self.connection().await?;
        let generation: Option<u64> = redis::cmd("GET")
            .arg(self.generation_key(key))
            .query_async(&mut conn)
            .await
            .map_err(|err| unavailable("GET", err))?;
        Ok(generation.unwrap_or(0))
    }

    async fn set_if_generation(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        generation: u64,
    ) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let written: i64 = self
            .set_if_generation
            .key(self.namespaced(key))
            .key(self.generation_key(key))
            .arg(value)
            .arg(generation.to_string())
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(|err| unavailable("EVALSHA", err))?;
        Ok(written == 1)
    }

    async fn delete(&self, keys: &[&str]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        let namespaced: Vec<String> = keys.iter().map(|key| self.namespaced(key)).collect();
        let mut pipe = redis::pipe();
        pipe.atomic().cmd("DEL").arg(&namespaced).ignore();
        for key in keys {
            pipe.cmd("INCR").arg(self.generation_key(key)).ignore();
        }
        let () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|err| unavailable("DEL", err))?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|err| unavailable("PING", err))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
