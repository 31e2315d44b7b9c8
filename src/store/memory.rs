//! In-process hash store.
//!
//! Implements both store traits over shared maps with Redis hash semantics:
//! a hash disappears when its last field is deleted, and an HSCAN cursor
//! resumes after the last field it returned, so fields present for the whole
//! scan are seen exactly once. Clones share the same data, so two clones
//! behave like two clients of one server.
//!
//! Meant for tests and embedding. All hashes share one lock.

use super::{AsyncHashStore, HashStore, ScanPage, SetCondition, StoreFuture};
use crate::core::error::{StoreError, StoreResult};
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

type Hash = BTreeMap<Bytes, Bytes>;

/// Scans left open at once before the oldest cursor is dropped.
pub const MAX_OPEN_SCANS: usize = 4096;

/// Shared in-memory hash store.
#[derive(Debug, Clone, Default)]
pub struct MemoryHashStore {
    data: Arc<RwLock<HashMap<String, Hash>>>,
    scans: Arc<Mutex<ScanCursors>>,
}

/// Open HSCAN positions: cursor to the key and the last field returned.
#[derive(Debug, Default)]
struct ScanCursors {
    last_id: u64,
    open: HashMap<u64, (String, Bytes)>,
}

impl ScanCursors {
    fn open(&mut self, key: &str, last_field: Bytes) -> u64 {
        if self.open.len() >= MAX_OPEN_SCANS {
            if let Some(oldest) = self.open.keys().min().copied() {
                self.open.remove(&oldest);
            }
        }
        // 0 is reserved for "start" and "done".
        self.last_id = self.last_id.wrapping_add(1).max(1);
        self.open.insert(self.last_id, (key.to_string(), last_field));
        self.last_id
    }

    /// Consume a cursor issued for `key`.
    fn take(&mut self, cursor: u64, key: &str) -> Option<Bytes> {
        match self.open.remove(&cursor) {
            Some((owner, last_field)) if owner == key => Some(last_field),
            _ => None,
        }
    }
}

impl MemoryHashStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of hash keys currently held.
    pub fn key_count(&self) -> usize {
        self.data.read().len()
    }

    /// Whether a hash key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    fn set_field(&self, key: &str, field: &[u8], value: &[u8], condition: SetCondition) -> bool {
        let mut data = self.data.write();
        let hash = data.entry(key.to_string()).or_default();
        let field = Bytes::copy_from_slice(field);
        let value = Bytes::copy_from_slice(value);

        match condition {
            SetCondition::Always => hash.insert(field, value).is_none(),
            SetCondition::NotExists => {
                if hash.contains_key(&field) {
                    return false;
                }
                hash.insert(field, value);
                true
            }
        }
    }

    fn get_field(&self, key: &str, field: &[u8]) -> Option<Bytes> {
        self.data.read().get(key).and_then(|h| h.get(field).cloned())
    }

    fn field_exists(&self, key: &str, field: &[u8]) -> bool {
        self.data
            .read()
            .get(key)
            .map(|h| h.contains_key(field))
            .unwrap_or(false)
    }

    fn delete_field(&self, key: &str, field: &[u8]) -> bool {
        let mut data = self.data.write();
        let Some(hash) = data.get_mut(key) else {
            return false;
        };
        let removed = hash.remove(field).is_some();
        if hash.is_empty() {
            data.remove(key);
        }
        removed
    }

    fn delete_key(&self, key: &str) -> bool {
        self.data.write().remove(key).is_some()
    }

    fn field_count(&self, key: &str) -> u64 {
        self.data.read().get(key).map(|h| h.len() as u64).unwrap_or(0)
    }

    fn fields(&self, key: &str) -> Vec<Bytes> {
        self.data
            .read()
            .get(key)
            .map(|h| h.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn values(&self, key: &str) -> Vec<Bytes> {
        self.data
            .read()
            .get(key)
            .map(|h| h.values().cloned().collect())
            .unwrap_or_default()
    }

    fn entries(&self, key: &str) -> Vec<(Bytes, Bytes)> {
        self.data
            .read()
            .get(key)
            .map(|h| h.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// One page in field order. A cursor can be used once; unknown or
    /// evicted cursors are rejected the way Redis rejects a bad cursor.
    fn scan(&self, key: &str, cursor: u64, count: usize) -> StoreResult<ScanPage> {
        let count = count.max(1);
        let lower = if cursor == 0 {
            Bound::Unbounded
        } else {
            let last_field = self.scans.lock().take(cursor, key);
            match last_field {
                Some(field) => Bound::Excluded(field),
                None => {
                    return Err(StoreError::Server {
                        kind: "ERR".to_string(),
                        message: "invalid cursor".to_string(),
                    })
                }
            }
        };

        let (entries, more) = {
            let data = self.data.read();
            let Some(hash) = data.get(key) else {
                return Ok(ScanPage::default());
            };
            let mut rest = hash
                .range((lower, Bound::Unbounded))
                .map(|(f, v)| (f.clone(), v.clone()));
            let entries: Vec<(Bytes, Bytes)> = rest.by_ref().take(count).collect();
            (entries, rest.next().is_some())
        };

        let cursor = match entries.last() {
            Some((last_field, _)) if more => self.scans.lock().open(key, last_field.clone()),
            _ => 0,
        };

        Ok(ScanPage { cursor, entries })
    }
}

impl HashStore for MemoryHashStore {
    fn hset(&self, key: &str, field: &[u8], value: &[u8], condition: SetCondition) -> StoreResult<bool> {
        Ok(self.set_field(key, field, value, condition))
    }

    fn hget(&self, key: &str, field: &[u8]) -> StoreResult<Option<Bytes>> {
        Ok(self.get_field(key, field))
    }

    fn hexists(&self, key: &str, field: &[u8]) -> StoreResult<bool> {
        Ok(self.field_exists(key, field))
    }

    fn hdel(&self, key: &str, field: &[u8]) -> StoreResult<bool> {
        Ok(self.delete_field(key, field))
    }

    fn del(&self, key: &str) -> StoreResult<bool> {
        Ok(self.delete_key(key))
    }

    fn hlen(&self, key: &str) -> StoreResult<u64> {
        Ok(self.field_count(key))
    }

    fn hkeys(&self, key: &str) -> StoreResult<Vec<Bytes>> {
        Ok(self.fields(key))
    }

    fn hvals(&self, key: &str) -> StoreResult<Vec<Bytes>> {
        Ok(self.values(key))
    }

    fn hgetall(&self, key: &str) -> StoreResult<Vec<(Bytes, Bytes)>> {
        Ok(self.entries(key))
    }

    fn hscan(&self, key: &str, cursor: u64, count: usize) -> StoreResult<ScanPage> {
        self.scan(key, cursor, count)
    }
}

// Work runs on first poll, and no lock is held across an await.
impl AsyncHashStore for MemoryHashStore {
    fn hset<'a>(
        &'a self,
        key: &'a str,
        field: &'a [u8],
        value: &'a [u8],
        condition: SetCondition,
    ) -> StoreFuture<'a, bool> {
        Box::pin(async move { Ok(self.set_field(key, field, value, condition)) })
    }

    fn hget<'a>(&'a self, key: &'a str, field: &'a [u8]) -> StoreFuture<'a, Option<Bytes>> {
        Box::pin(async move { Ok(self.get_field(key, field)) })
    }

    fn hexists<'a>(&'a self, key: &'a str, field: &'a [u8]) -> StoreFuture<'a, bool> {
        Box::pin(async move { Ok(self.field_exists(key, field)) })
    }

    fn hdel<'a>(&'a self, key: &'a str, field: &'a [u8]) -> StoreFuture<'a, bool> {
        Box::pin(async move { Ok(self.delete_field(key, field)) })
    }

    fn del<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move { Ok(self.delete_key(key)) })
    }

    fn hlen<'a>(&'a self, key: &'a str) -> StoreFuture<'a, u64> {
        Box::pin(async move { Ok(self.field_count(key)) })
    }

    fn hkeys<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Vec<Bytes>> {
        Box::pin(async move { Ok(self.fields(key)) })
    }

    fn hvals<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Vec<Bytes>> {
        Box::pin(async move { Ok(self.values(key)) })
    }

    fn hgetall<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Vec<(Bytes, Bytes)>> {
        Box::pin(async move { Ok(self.entries(key)) })
    }

    fn hscan<'a>(&'a self, key: &'a str, cursor: u64, count: usize) -> StoreFuture<'a, ScanPage> {
        Box::pin(async move { self.scan(key, cursor, count) })
    }
}
