use std::sync::Arc;

use redis::AsyncCommands;
use tokio::sync::Mutex;

use crate::error::{KvError, Result};

/// Thin wrapper over a lazily-established multiplexed Redis connection.
///
/// The connection is established on first use rather than at construction,
/// so building a `KvStore` never fails on a transient network hiccup at boot.
#[derive(Clone)]
pub struct KvStore {
    client: redis::Client,
    conn: Arc<Mutex<Option<redis::aio::MultiplexedConnection>>>,
}

impl KvStore {
    pub fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| KvError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            conn: Arc::new(Mutex::new(None)),
        })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| KvError::Connection(e.to_string()))?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        Ok(conn.get(key).await?)
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    pub async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    pub async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }

    pub async fn expire(&self, key: &str, ttl_secs: i64) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.expire(key, ttl_secs).await?;
        Ok(())
    }

    pub async fn lpush(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.lpush(key, value).await?;
        Ok(())
    }

    pub async fn rpush(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.rpush(key, value).await?;
        Ok(())
    }

    pub async fn llen(&self, key: &str) -> Result<i64> {
        let mut conn = self.connection().await?;
        Ok(conn.llen(key).await?)
    }

    pub async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        Ok(conn.lrange(key, start, stop).await?)
    }

    /// Blocking pop with a timeout (seconds); returns `None` on timeout.
    pub async fn brpop(&self, key: &str, timeout_secs: f64) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        let result: Option<(String, String)> = conn.brpop(key, timeout_secs).await?;
        Ok(result.map(|(_, v)| v))
    }

    pub async fn lrem(&self, key: &str, count: isize, value: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.lrem(key, count, value).await?;
        Ok(())
    }

    pub async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.hset(key, field, value).await?;
        Ok(())
    }

    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        Ok(conn.hget(key, field).await?)
    }

    pub async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.hdel(key, field).await?;
        Ok(())
    }

    pub async fn hlen(&self, key: &str) -> Result<i64> {
        let mut conn = self.connection().await?;
        Ok(conn.hlen(key).await?)
    }

    pub async fn hkeys(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        Ok(conn.hkeys(key).await?)
    }

    pub async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.zadd(key, member, score).await?;
        Ok(())
    }

    pub async fn zrem(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.zrem(key, member).await?;
        Ok(())
    }

    pub async fn zcard(&self, key: &str) -> Result<i64> {
        let mut conn = self.connection().await?;
        Ok(conn.zcard(key).await?)
    }

    /// Members ordered by score descending (highest priority first), capped at `limit`.
    pub async fn zrevrange(&self, key: &str, limit: isize) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        Ok(conn.zrevrange(key, 0, limit.saturating_sub(1).max(0)).await?)
    }

    pub async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        let mut iter: redis::AsyncIter<String> = conn.scan_match(pattern).await?;
        let mut out = Vec::new();
        use futures_util::StreamExt;
        while let Some(key) = iter.next().await {
            out.push(key);
        }
        Ok(out)
    }

    pub async fn key_type(&self, key: &str) -> Result<String> {
        let mut conn = self.connection().await?;
        Ok(redis::cmd("TYPE").arg(key).query_async(&mut conn).await?)
    }
}
