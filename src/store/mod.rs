//! Remote hash store interface.
//!
//! Collections never talk to a wire protocol directly. They issue hash
//! primitives against one of these traits, addressed by a namespace key and
//! (where relevant) a field. Each primitive maps to exactly one Redis command
//! and is atomic on the server:
//!
//! | Primitive | Command |
//! |-----------|---------|
//! | `hset` (Always / NotExists) | HSET / HSETNX |
//! | `hget`, `hexists`, `hdel` | HGET, HEXISTS, HDEL |
//! | `del` | DEL |
//! | `hlen`, `hkeys`, `hvals`, `hgetall` | HLEN, HKEYS, HVALS, HGETALL |
//! | `hscan` | HSCAN key cursor COUNT n |
//!
//! [`HashStore`] blocks the calling thread; [`AsyncHashStore`] returns boxed
//! futures. Both are object safe.

pub mod memory;
pub mod redis;

pub use memory::MemoryHashStore;
pub use redis::{AsyncRedisConnection, RedisConnection};

use crate::core::error::StoreResult;
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;

/// Future returned by [`AsyncHashStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Condition attached to a field write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetCondition {
    /// Insert or replace (HSET).
    #[default]
    Always,
    /// Insert only if the field is absent (HSETNX).
    NotExists,
}

/// One page of an incremental hash scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next call (0 = iteration complete).
    pub cursor: u64,

    /// Field/value pairs in this page.
    pub entries: Vec<(Bytes, Bytes)>,
}

impl ScanPage {
    /// Whether this is the last page.
    pub fn is_last(&self) -> bool {
        self.cursor == 0
    }
}

/// Blocking hash primitives.
pub trait HashStore: Send + Sync {
    /// Write a field. Returns whether the field was created (Always) or
    /// whether the write happened at all (NotExists).
    fn hset(&self, key: &str, field: &[u8], value: &[u8], condition: SetCondition) -> StoreResult<bool>;

    /// Read a field.
    fn hget(&self, key: &str, field: &[u8]) -> StoreResult<Option<Bytes>>;

    /// Check whether a field exists.
    fn hexists(&self, key: &str, field: &[u8]) -> StoreResult<bool>;

    /// Delete a field. Returns whether it existed.
    fn hdel(&self, key: &str, field: &[u8]) -> StoreResult<bool>;

    /// Delete the whole key. Returns whether it existed.
    fn del(&self, key: &str) -> StoreResult<bool>;

    /// Number of fields.
    fn hlen(&self, key: &str) -> StoreResult<u64>;

    /// All fields.
    fn hkeys(&self, key: &str) -> StoreResult<Vec<Bytes>>;

    /// All values.
    fn hvals(&self, key: &str) -> StoreResult<Vec<Bytes>>;

    /// All field/value pairs.
    fn hgetall(&self, key: &str) -> StoreResult<Vec<(Bytes, Bytes)>>;

    /// One page of an incremental scan starting at `cursor` (0 = start).
    fn hscan(&self, key: &str, cursor: u64, count: usize) -> StoreResult<ScanPage>;
}

/// Non-blocking hash primitives.
///
/// Each call returns a future that suspends until the server replies.
/// Dropping the future cancels the caller's wait.
pub trait AsyncHashStore: Send + Sync {
    /// Write a field (see [`HashStore::hset`]).
    fn hset<'a>(
        &'a self,
        key: &'a str,
        field: &'a [u8],
        value: &'a [u8],
        condition: SetCondition,
    ) -> StoreFuture<'a, bool>;

    /// Read a field.
    fn hget<'a>(&'a self, key: &'a str, field: &'a [u8]) -> StoreFuture<'a, Option<Bytes>>;

    /// Check whether a field exists.
    fn hexists<'a>(&'a self, key: &'a str, field: &'a [u8]) -> StoreFuture<'a, bool>;

    /// Delete a field.
    fn hdel<'a>(&'a self, key: &'a str, field: &'a [u8]) -> StoreFuture<'a, bool>;

    /// Delete the whole key.
    fn del<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool>;

    /// Number of fields.
    fn hlen<'a>(&'a self, key: &'a str) -> StoreFuture<'a, u64>;

    /// All fields.
    fn hkeys<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Vec<Bytes>>;

    /// All values.
    fn hvals<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Vec<Bytes>>;

    /// All field/value pairs.
    fn hgetall<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Vec<(Bytes, Bytes)>>;

    /// One page of an incremental scan.
    fn hscan<'a>(&'a self, key: &'a str, cursor: u64, count: usize) -> StoreFuture<'a, ScanPage>;
}
