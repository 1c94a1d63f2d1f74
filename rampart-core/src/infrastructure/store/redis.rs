//! Redis/Dragonfly store backend

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::{debug, warn};

use super::SharedStore;
use crate::application::errors::StoreError;

/// INCR that applies the expiry only when the key is created, in one round trip.
/// An expiry of 0 leaves the counter persistent.
const INCR_WITH_EXPIRY: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 and tonumber(ARGV[1]) > 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

/// Redis-compatible store shared between gateway instances
pub struct RedisStore {
    connection_manager: ConnectionManager,
    incr_script: redis::Script,
}

impl RedisStore {
    /// Connect and verify the server answers `PING`
    pub async fn new(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(|e| {
            warn!("Failed to create Redis client: {}", e);
            StoreError::unavailable(format!("Failed to create Redis client: {}", e))
        })?;

        let connection_manager = ConnectionManager::new(client).await.map_err(|e| {
            warn!("Failed to create Redis connection manager: {}", e);
            StoreError::unavailable(format!("Failed to create connection manager: {}", e))
        })?;

        let store = Self {
            connection_manager,
            incr_script: redis::Script::new(INCR_WITH_EXPIRY),
        };
        store.ping().await?;

        debug!("Successfully connected to Redis store at {}", url);
        Ok(store)
    }

    fn conn(&self) -> ConnectionManager {
        self.connection_manager.clone()
    }
}

fn millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn incr(&self, key: &str, ttl: Option<Duration>) -> Result<i64, StoreError> {
        let mut conn = self.conn();
        let count: i64 = self
            .incr_script
            .key(key)
            .arg(ttl.map(millis).unwrap_or(0))
            .invoke_async(&mut conn)
            .await?;
        Ok(count)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(millis(ttl));
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn();
        let removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut conn = self.conn();
        // -2: missing, -1: no expiry
        let remaining: i64 = redis::cmd("PTTL").arg(key).query_async(&mut conn).await?;
        Ok((remaining >= 0).then(|| Duration::from_millis(remaining as u64)))
    }

    async fn push_capped(
        &self,
        key: &str,
        value: &str,
        max_len: usize,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let stop = max_len.saturating_sub(1) as isize;
        let _: () = redis::pipe()
            .atomic()
            .cmd("LPUSH")
            .arg(key)
            .arg(value)
            .ignore()
            .cmd("LTRIM")
            .arg(key)
            .arg(0)
            .arg(stop)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn list_range(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn();
        let items: Vec<String> = redis::cmd("LRANGE")
            .arg(key)
            .arg(0)
            .arg(limit as isize - 1)
            .query_async(&mut conn)
            .await?;
        Ok(items)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
