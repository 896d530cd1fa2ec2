//! Redis-backed store.

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::{collections::HashMap, time::Duration};

use super::{BatchOp, KeyValueStore, ScanPage, StoreConfig, StoreError, StoreResult, WriteBatch};

/// Store implementation backed by a shared Redis connection manager
///
/// Cloning is cheap; every clone multiplexes over the same connection and
/// the manager reconnects transparently after a dropped connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis, retrying with a linear backoff
    ///
    /// # Arguments
    ///
    /// * `config` - Connection URL, per-attempt timeout and attempt count
    ///
    /// # Returns
    ///
    /// * `StoreResult<Self>` - Connected store, or `ConnectFailed` once every
    ///   attempt has failed
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let client = Client::open(config.redis_url.as_str())?;
        let timeout = Duration::from_secs(config.connect_timeout_secs.max(1));
        let attempts = config.reconnect_attempts.max(1);
        let mut reason = String::new();

        for attempt in 1..=attempts {
            match tokio::time::timeout(timeout, client.get_connection_manager()).await {
                Ok(Ok(conn)) => {
                    let store = Self { conn };
                    match store.ping().await {
                        Ok(()) => {
                            log::info!("Connected to Redis (attempt {}/{})", attempt, attempts);
                            return Ok(store);
                        }
                        Err(e) => reason = e.to_string(),
                    }
                }
                Ok(Err(e)) => reason = e.to_string(),
                Err(_) => reason = format!("timed out after {}s", timeout.as_secs()),
            }

            log::warn!(
                "Redis connection attempt {}/{} failed: {}",
                attempt,
                attempts,
                reason
            );
            if attempt < attempts {
                tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
            }
        }

        Err(StoreError::ConnectFailed { attempts, reason })
    }

    /// Wrap an already established connection manager
    pub fn from_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn();
        let found: bool = conn.exists(key).await?;
        Ok(found)
    }

    async fn del(&self, keys: &[String]) -> StoreResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn();
        let _: () = conn.del(keys).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn();
        let value: Option<String> = conn.hget(key, field).await?;
        Ok(value)
    }

    async fn hget_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let mut conn = self.conn();
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(fields)
    }

    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> StoreResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn();
        let _: () = conn.hset_multiple(key, fields).await?;
        Ok(())
    }

    async fn sadd(&self, key: &str, members: &[String]) -> StoreResult<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn();
        let _: () = conn.sadd(key, members).await?;
        Ok(())
    }

    async fn srem(&self, key: &str, members: &[String]) -> StoreResult<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn();
        let _: () = conn.srem(key, members).await?;
        Ok(())
    }

    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn();
        let members: Vec<String> = conn.smembers(key).await?;
        Ok(members)
    }

    async fn scard(&self, key: &str) -> StoreResult<usize> {
        let mut conn = self.conn();
        let count: usize = conn.scard(key).await?;
        Ok(count)
    }

    async fn sismember(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut conn = self.conn();
        let found: bool = conn.sismember(key, member).await?;
        Ok(found)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        let mut conn = self.conn();
        let _: () = conn.zadd(key, member, score).await?;
        Ok(())
    }

    async fn zrem(&self, key: &str, member: &str) -> StoreResult<()> {
        let mut conn = self.conn();
        let _: () = conn.zrem(key, member).await?;
        Ok(())
    }

    async fn zrange(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>> {
        let mut conn = self.conn();
        let members: Vec<String> = conn.zrange(key, start, stop).await?;
        Ok(members)
    }

    async fn rpush(&self, key: &str, values: &[String]) -> StoreResult<()> {
        if values.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn();
        let _: () = conn.rpush(key, values).await?;
        Ok(())
    }

    async fn rpop(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn();
        let value: Option<String> = conn.rpop(key, None).await?;
        Ok(value)
    }

    async fn llen(&self, key: &str) -> StoreResult<usize> {
        let mut conn = self.conn();
        let len: usize = conn.llen(key).await?;
        Ok(len)
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>> {
        let mut conn = self.conn();
        let values: Vec<String> = conn.lrange(key, start, stop).await?;
        Ok(values)
    }

    async fn ltrim(&self, key: &str, start: isize, stop: isize) -> StoreResult<()> {
        let mut conn = self.conn();
        let _: () = conn.ltrim(key, start, stop).await?;
        Ok(())
    }

    async fn execute_batch(&self, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in batch.into_ops() {
            match op {
                BatchOp::HSet { key, fields } => {
                    pipe.hset_multiple(key, &fields).ignore();
                }
                BatchOp::Del { key } => {
                    pipe.del(key).ignore();
                }
                BatchOp::RPush { key, values } => {
                    pipe.rpush(key, values).ignore();
                }
            }
        }

        let mut conn = self.conn();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> StoreResult<ScanPage> {
        let mut conn = self.conn();
        let (cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;
        Ok(ScanPage { cursor, keys })
    }
}
