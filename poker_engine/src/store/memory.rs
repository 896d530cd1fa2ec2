//! In-process store with Redis-compatible semantics.
//!
//! Used by tests and benchmarks. Collections that become empty are removed,
//! negative range indices count from the end, and a key holding one type
//! rejects commands for another, all as Redis does. Fault injection lets
//! tests take the store offline or fail upcoming batches.

use async_trait::async_trait;
use std::{
    cmp::Ordering as CmpOrdering,
    collections::{BTreeSet, HashMap, VecDeque},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tokio::sync::RwLock;

use super::{BatchOp, KeyValueStore, ScanPage, StoreError, StoreResult, WriteBatch};

#[derive(Debug, Clone)]
enum Entry {
    Str(String),
    Hash(HashMap<String, String>),
    Set(BTreeSet<String>),
    ZSet(Vec<(f64, String)>),
    List(VecDeque<String>),
}

impl Entry {
    fn type_name(&self) -> &'static str {
        match self {
            Entry::Str(_) => "string",
            Entry::Hash(_) => "hash",
            Entry::Set(_) => "set",
            Entry::ZSet(_) => "zset",
            Entry::List(_) => "list",
        }
    }
}

type Data = HashMap<String, Entry>;

/// In-memory `KeyValueStore`
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Data>,
    offline: AtomicBool,
    failing_batches: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent command fail with `Unavailable` until reset
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail the next `count` calls to `execute_batch` while reads keep working
    pub fn fail_next_batches(&self, count: usize) {
        self.failing_batches.store(count, Ordering::SeqCst);
    }

    /// Number of keys currently stored
    pub async fn key_count(&self) -> usize {
        self.data.read().await.len()
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    fn take_batch_failure(&self) -> bool {
        self.failing_batches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn wrong_type(key: &str, expected: &'static str) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
        expected,
    }
}

fn check_type(data: &Data, key: &str, expected: &'static str) -> StoreResult<()> {
    match data.get(key) {
        Some(entry) if entry.type_name() != expected => Err(wrong_type(key, expected)),
        _ => Ok(()),
    }
}

fn hash_ref<'a>(data: &'a Data, key: &str) -> StoreResult<Option<&'a HashMap<String, String>>> {
    match data.get(key) {
        None => Ok(None),
        Some(Entry::Hash(h)) => Ok(Some(h)),
        Some(_) => Err(wrong_type(key, "hash")),
    }
}

fn set_ref<'a>(data: &'a Data, key: &str) -> StoreResult<Option<&'a BTreeSet<String>>> {
    match data.get(key) {
        None => Ok(None),
        Some(Entry::Set(s)) => Ok(Some(s)),
        Some(_) => Err(wrong_type(key, "set")),
    }
}

fn zset_ref<'a>(data: &'a Data, key: &str) -> StoreResult<Option<&'a Vec<(f64, String)>>> {
    match data.get(key) {
        None => Ok(None),
        Some(Entry::ZSet(z)) => Ok(Some(z)),
        Some(_) => Err(wrong_type(key, "zset")),
    }
}

fn list_ref<'a>(data: &'a Data, key: &str) -> StoreResult<Option<&'a VecDeque<String>>> {
    match data.get(key) {
        None => Ok(None),
        Some(Entry::List(l)) => Ok(Some(l)),
        Some(_) => Err(wrong_type(key, "list")),
    }
}

fn apply_hset(data: &mut Data, key: &str, fields: &[(String, String)]) -> StoreResult<()> {
    if fields.is_empty() {
        return Ok(());
    }
    let entry = data
        .entry(key.to_string())
        .or_insert_with(|| Entry::Hash(HashMap::new()));
    match entry {
        Entry::Hash(hash) => {
            for (field, value) in fields {
                hash.insert(field.clone(), value.clone());
            }
            Ok(())
        }
        _ => Err(wrong_type(key, "hash")),
    }
}

fn apply_rpush(data: &mut Data, key: &str, values: &[String]) -> StoreResult<()> {
    if values.is_empty() {
        return Ok(());
    }
    let entry = data
        .entry(key.to_string())
        .or_insert_with(|| Entry::List(VecDeque::new()));
    match entry {
        Entry::List(list) => {
            list.extend(values.iter().cloned());
            Ok(())
        }
        _ => Err(wrong_type(key, "list")),
    }
}

/// Resolve Redis-style inclusive range indices against a collection length
fn normalize_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}

/// Glob match supporting `*` and `?`
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.as_bytes();
    let text = text.as_bytes();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = backtrack {
            p = star_p + 1;
            t = star_t + 1;
            backtrack = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }
    p == pattern.len()
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.check_online()
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.check_online()?;
        Ok(self.data.read().await.contains_key(key))
    }

    async fn del(&self, keys: &[String]) -> StoreResult<()> {
        self.check_online()?;
        let mut data = self.data.write().await;
        for key in keys {
            data.remove(key);
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.check_online()?;
        match self.data.read().await.get(key) {
            None => Ok(None),
            Some(Entry::Str(s)) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type(key, "string")),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.check_online()?;
        self.data
            .write()
            .await
            .insert(key.to_string(), Entry::Str(value.to_string()));
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.check_online()?;
        let data = self.data.read().await;
        Ok(hash_ref(&data, key)?.and_then(|h| h.get(field).cloned()))
    }

    async fn hget_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        self.check_online()?;
        let data = self.data.read().await;
        Ok(hash_ref(&data, key)?.cloned().unwrap_or_default())
    }

    async fn hset_multiple(&self, key: &str, fields: &[(String, String)]) -> StoreResult<()> {
        self.check_online()?;
        apply_hset(&mut *self.data.write().await, key, fields)
    }

    async fn sadd(&self, key: &str, members: &[String]) -> StoreResult<()> {
        self.check_online()?;
        if members.is_empty() {
            return Ok(());
        }
        let mut data = self.data.write().await;
        let entry = data
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(BTreeSet::new()));
        match entry {
            Entry::Set(set) => {
                set.extend(members.iter().cloned());
                Ok(())
            }
            _ => Err(wrong_type(key, "set")),
        }
    }

    async fn srem(&self, key: &str, members: &[String]) -> StoreResult<()> {
        self.check_online()?;
        let mut data = self.data.write().await;
        let now_empty = match data.get_mut(key) {
            None => return Ok(()),
            Some(Entry::Set(set)) => {
                for member in members {
                    set.remove(member);
                }
                set.is_empty()
            }
            Some(_) => return Err(wrong_type(key, "set")),
        };
        if now_empty {
            data.remove(key);
        }
        Ok(())
    }

    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        self.check_online()?;
        let data = self.data.read().await;
        Ok(set_ref(&data, key)?
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn scard(&self, key: &str) -> StoreResult<usize> {
        self.check_online()?;
        let data = self.data.read().await;
        Ok(set_ref(&data, key)?.map_or(0, BTreeSet::len))
    }

    async fn sismember(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.check_online()?;
        let data = self.data.read().await;
        Ok(set_ref(&data, key)?.is_some_and(|s| s.contains(member)))
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        self.check_online()?;
        let mut data = self.data.write().await;
        let entry = data
            .entry(key.to_string())
            .or_insert_with(|| Entry::ZSet(Vec::new()));
        match entry {
            Entry::ZSet(zset) => {
                zset.retain(|(_, m)| m != member);
                zset.push((score, member.to_string()));
                zset.sort_by(|a, b| {
                    a.0.partial_cmp(&b.0)
                        .unwrap_or(CmpOrdering::Equal)
                        .then_with(|| a.1.cmp(&b.1))
                });
                Ok(())
            }
            _ => Err(wrong_type(key, "zset")),
        }
    }

    async fn zrem(&self, key: &str, member: &str) -> StoreResult<()> {
        self.check_online()?;
        let mut data = self.data.write().await;
        let now_empty = match data.get_mut(key) {
            None => return Ok(()),
            Some(Entry::ZSet(zset)) => {
                zset.retain(|(_, m)| m != member);
                zset.is_empty()
            }
            Some(_) => return Err(wrong_type(key, "zset")),
        };
        if now_empty {
            data.remove(key);
        }
        Ok(())
    }

    async fn zrange(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>> {
        self.check_online()?;
        let data = self.data.read().await;
        let Some(zset) = zset_ref(&data, key)? else {
            return Ok(Vec::new());
        };
        Ok(match normalize_range(zset.len(), start, stop) {
            Some((from, to)) => zset[from..=to].iter().map(|(_, m)| m.clone()).collect(),
            None => Vec::new(),
        })
    }

    async fn rpush(&self, key: &str, values: &[String]) -> StoreResult<()> {
        self.check_online()?;
        apply_rpush(&mut *self.data.write().await, key, values)
    }

    async fn rpop(&self, key: &str) -> StoreResult<Option<String>> {
        self.check_online()?;
        let mut data = self.data.write().await;
        let (value, now_empty) = match data.get_mut(key) {
            None => return Ok(None),
            Some(Entry::List(list)) => (list.pop_back(), list.is_empty()),
            Some(_) => return Err(wrong_type(key, "list")),
        };
        if now_empty {
            data.remove(key);
        }
        Ok(value)
    }

    async fn llen(&self, key: &str) -> StoreResult<usize> {
        self.check_online()?;
        let data = self.data.read().await;
        Ok(list_ref(&data, key)?.map_or(0, VecDeque::len))
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>> {
        self.check_online()?;
        let data = self.data.read().await;
        let Some(list) = list_ref(&data, key)? else {
            return Ok(Vec::new());
        };
        Ok(match normalize_range(list.len(), start, stop) {
            Some((from, to)) => list.range(from..=to).cloned().collect(),
            None => Vec::new(),
        })
    }

    async fn ltrim(&self, key: &str, start: isize, stop: isize) -> StoreResult<()> {
        self.check_online()?;
        let mut data = self.data.write().await;
        let now_empty = match data.get_mut(key) {
            None => return Ok(()),
            Some(Entry::List(list)) => {
                match normalize_range(list.len(), start, stop) {
                    Some((from, to)) => {
                        list.truncate(to + 1);
                        list.drain(..from);
                    }
                    None => list.clear(),
                }
                list.is_empty()
            }
            Some(_) => return Err(wrong_type(key, "list")),
        };
        if now_empty {
            data.remove(key);
        }
        Ok(())
    }

    async fn execute_batch(&self, batch: WriteBatch) -> StoreResult<()> {
        self.check_online()?;
        if self.take_batch_failure() {
            return Err(StoreError::Unavailable("injected batch failure".to_string()));
        }

        let mut data = self.data.write().await;

        // Validate every op up front so a type error leaves nothing applied.
        // A delete earlier in the batch frees its key for any later type.
        let mut deleted: Vec<&str> = Vec::new();
        for op in batch.ops() {
            match op {
                BatchOp::Del { key } => deleted.push(key.as_str()),
                BatchOp::HSet { key, .. } if !deleted.contains(&key.as_str()) => {
                    check_type(&data, key, "hash")?
                }
                BatchOp::RPush { key, .. } if !deleted.contains(&key.as_str()) => {
                    check_type(&data, key, "list")?
                }
                _ => {}
            }
        }

        for op in batch.into_ops() {
            match op {
                BatchOp::HSet { key, fields } => apply_hset(&mut data, &key, &fields)?,
                BatchOp::Del { key } => {
                    data.remove(&key);
                }
                BatchOp::RPush { key, values } => apply_rpush(&mut data, &key, &values)?,
            }
        }
        Ok(())
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> StoreResult<ScanPage> {
        self.check_online()?;
        let data = self.data.read().await;
        let mut all: Vec<&String> = data.keys().collect();
        all.sort();

        let start = usize::try_from(cursor).unwrap_or(usize::MAX).min(all.len());
        let end = start.saturating_add(count.max(1)).min(all.len());
        let keys = all[start..end]
            .iter()
            .filter(|k| glob_match(pattern, k))
            .map(|k| (*k).clone())
            .collect();
        let cursor = if end >= all.len() { 0 } else { end as u64 };
        Ok(ScanPage { cursor, keys })
    }
}
