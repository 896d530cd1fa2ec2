//! Store module providing the key/value abstraction every service runs on.
//!
//! This module implements:
//! - `KeyValueStore`: the command surface the engine needs (hashes, sets,
//!   sorted sets, lists, atomic batches, cursor scans)
//! - `RedisStore`: production implementation over a Redis connection manager
//! - `MemoryStore`: in-process implementation with the same semantics, used
//!   by tests and benchmarks
//! - `KeyBuilder`: the key layout shared by every service
//!
//! ## Atomicity
//!
//! Single commands are atomic. A `WriteBatch` is executed as one unit
//! (`MULTI`/`EXEC` on Redis) so readers never observe a half-applied batch,
//! but two separate batches may interleave with other writers.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

pub mod config;
pub mod errors;
pub mod keys;
pub mod memory;
pub mod redis_store;

pub use config::StoreConfig;
pub use errors::{StoreError, StoreResult};
pub use keys::KeyBuilder;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Default number of keys requested per scan page
pub const DEFAULT_SCAN_COUNT: usize = 100;

/// A single write inside a `WriteBatch`
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Set several hash fields
    HSet {
        key: String,
        fields: Vec<(String, String)>,
    },
    /// Delete a key
    Del { key: String },
    /// Append values to the tail of a list
    RPush { key: String, values: Vec<String> },
}

/// Group of writes executed as one atomic unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set several fields of a hash
    pub fn hset<K, V>(mut self, key: impl Into<String>, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields: Vec<(String, String)> = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if !fields.is_empty() {
            self.ops.push(BatchOp::HSet {
                key: key.into(),
                fields,
            });
        }
        self
    }

    /// Delete a key
    pub fn del(mut self, key: impl Into<String>) -> Self {
        self.ops.push(BatchOp::Del { key: key.into() });
        self
    }

    /// Append values to a list
    pub fn rpush(mut self, key: impl Into<String>, values: Vec<String>) -> Self {
        if !values.is_empty() {
            self.ops.push(BatchOp::RPush {
                key: key.into(),
                values,
            });
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// One page of a cursor scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor to resume from; 0 once the scan is complete
    pub cursor: u64,
    /// Keys matched in this page (may be empty even when the scan continues)
    pub keys: Vec<String>,
}

/// Command surface of the shared key/value store
///
/// Missing keys are never errors: reads of an absent key return an empty
/// collection, zero, or `None`. Errors are reserved for an unreachable store
/// or a key holding the wrong type.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Check connectivity
    async fn ping(&self) -> StoreResult<()>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    async fn del(&self, keys: &[String]) -> StoreResult<()>;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    async fn hget_all(&self, key: &str) -> StoreResult<HashMap<String, String>>;

    /// Set several hash fields in one command
    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> StoreResult<()>;

    async fn sadd(&self, key: &str, members: &[String]) -> StoreResult<()>;

    async fn srem(&self, key: &str, members: &[String]) -> StoreResult<()>;

    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>>;

    async fn scard(&self, key: &str) -> StoreResult<usize>;

    async fn sismember(&self, key: &str, member: &str) -> StoreResult<bool>;

    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()>;

    async fn zrem(&self, key: &str, member: &str) -> StoreResult<()>;

    /// Members ordered by score, Redis index semantics (negative from the end)
    async fn zrange(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>>;

    async fn rpush(&self, key: &str, values: &[String]) -> StoreResult<()>;

    /// Atomically remove and return the last list element
    async fn rpop(&self, key: &str) -> StoreResult<Option<String>>;

    async fn llen(&self, key: &str) -> StoreResult<usize>;

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>>;

    async fn ltrim(&self, key: &str, start: isize, stop: isize) -> StoreResult<()>;

    /// Execute every write in the batch as one atomic unit
    async fn execute_batch(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Fetch one page of keys matching a glob pattern, starting at `cursor`
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> StoreResult<ScanPage>;
}

/// Resumable iterator over the keys matching a pattern
///
/// Wraps the cursor protocol of `KeyValueStore::scan`. A key may be reported
/// more than once by the underlying store; `collect_all` removes duplicates.
pub struct KeyScan<'a> {
    store: &'a dyn KeyValueStore,
    pattern: String,
    count: usize,
    cursor: u64,
    finished: bool,
}

impl<'a> KeyScan<'a> {
    pub fn new(store: &'a dyn KeyValueStore, pattern: impl Into<String>) -> Self {
        Self {
            store,
            pattern: pattern.into(),
            count: DEFAULT_SCAN_COUNT,
            cursor: 0,
            finished: false,
        }
    }

    /// Override the page size hint
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count.max(1);
        self
    }

    /// Cursor the next page will be requested from
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Fetch the next page, or `None` once the scan has completed
    pub async fn next_page(&mut self) -> StoreResult<Option<Vec<String>>> {
        if self.finished {
            return Ok(None);
        }
        let page = self.store.scan(self.cursor, &self.pattern, self.count).await?;
        self.cursor = page.cursor;
        if page.cursor == 0 {
            self.finished = true;
        }
        Ok(Some(page.keys))
    }

    /// Drain the scan, returning every distinct key in discovery order
    pub async fn collect_all(mut self) -> StoreResult<Vec<String>> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        while let Some(page) = self.next_page().await? {
            for key in page {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }
}
