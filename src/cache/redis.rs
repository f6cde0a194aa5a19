//! Redis-backed TTL cache for multi-node deployments
//!
//! Expiry is delegated to Redis (`SET .. PX`), so entries vanish on the
//! server at their deadline.

use super::TtlCache;
use crate::error::AuthError;

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, Client};
use std::time::Duration;
use tokio::time::timeout;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Cache stored in Redis
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    /// Connect and verify the server answers `PING`.
    pub async fn connect(url: &str) -> Result<Self, AuthError> {
        tracing::info!("Connecting to Redis cache");

        let client = Client::open(url)?;
        let mut conn = timeout(COMMAND_TIMEOUT, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| AuthError::Cache("timed out connecting to redis".to_string()))??;

        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong != "PONG" {
            return Err(AuthError::Cache("redis ping did not return pong".to_string()));
        }

        tracing::info!("Redis cache connection established");
        Ok(Self { conn })
    }

    async fn run<T: redis::FromRedisValue>(&self, cmd: redis::Cmd) -> Result<T, AuthError> {
        let mut conn = self.conn.clone();
        timeout(COMMAND_TIMEOUT, cmd.query_async::<T>(&mut conn))
            .await
            .map_err(|_| AuthError::Cache("redis command timed out".to_string()))?
            .map_err(AuthError::from)
    }
}

#[async_trait]
impl TtlCache for RedisCache {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AuthError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("PX").arg(ttl.as_millis().max(1) as u64);
        self.run::<()>(cmd).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.run(cmd).await
    }

    async fn delete(&self, key: &str) -> Result<bool, AuthError> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        let removed: i64 = self.run(cmd).await?;
        Ok(removed > 0)
    }

    async fn incr(&self, key: &str, ttl: Duration) -> Result<u64, AuthError> {
        // NX keeps the window of an existing counter.
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("INCR")
            .arg(key)
            .cmd("PEXPIRE")
            .arg(key)
            .arg(ttl.as_millis().max(1) as u64)
            .arg("NX")
            .ignore();

        let mut conn = self.conn.clone();
        let (count,): (u64,) = timeout(COMMAND_TIMEOUT, pipe.query_async(&mut conn))
            .await
            .map_err(|_| AuthError::Cache("redis command timed out".to_string()))??;
        Ok(count)
    }
}
