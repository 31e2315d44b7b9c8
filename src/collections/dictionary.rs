//! Blocking dictionary adapter.

use super::DICTIONARY_TYPE_TAG;
use crate::core::error::{CollectionError, CollectionResult};
use crate::keys::{KeyBuilder, NamespaceKey};
use crate::options::CollectionOptions;
use crate::serializer::{JsonSerializer, RedisSerializer};
use crate::store::{HashStore, SetCondition};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

/// Dictionary whose entries live in one Redis hash.
///
/// Keys are serialized into hash fields and values into hash values. Every
/// call goes to the store; nothing is cached locally, so several adapters
/// (or processes) built with the same name observe each other's writes.
pub struct RedisDictionary<K, V, S: ?Sized, KS = JsonSerializer, VS = JsonSerializer> {
    store: Arc<S>,
    key: NamespaceKey,
    name: String,
    options: Arc<CollectionOptions<KS, VS>>,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, S: ?Sized, KS, VS> Clone for RedisDictionary<K, V, S, KS, VS> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key.clone(),
            name: self.name.clone(),
            options: Arc::clone(&self.options),
            _marker: PhantomData,
        }
    }
}

impl<K, V, S, KS, VS> RedisDictionary<K, V, S, KS, VS>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
    S: HashStore + ?Sized,
    KS: RedisSerializer,
    VS: RedisSerializer,
{
    /// Create an adapter for the dictionary called `name`. Does no I/O.
    pub fn new(
        store: Arc<S>,
        name: impl Into<String>,
        options: Arc<CollectionOptions<KS, VS>>,
    ) -> Self {
        let name = name.into();
        Self {
            key: KeyBuilder::build(DICTIONARY_TYPE_TAG, &name),
            store,
            name,
            options,
            _marker: PhantomData,
        }
    }

    /// Logical name this adapter was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Redis key holding the entries.
    pub fn namespace_key(&self) -> &NamespaceKey {
        &self.key
    }

    pub fn options(&self) -> &CollectionOptions<KS, VS> {
        &self.options
    }

    /// Insert a new entry.
    ///
    /// Uses a single HSETNX, so of two concurrent adders for the same key
    /// exactly one succeeds. Fails with [`CollectionError::DuplicateKey`]
    /// and leaves the stored value untouched when the key exists.
    pub fn add(&self, key: &K, value: &V) -> CollectionResult<()> {
        let field = self.options.encode_key(key)?;
        let value = self.options.encode_value(value)?;
        if self
            .store
            .hset(self.key.as_str(), &field, &value, SetCondition::NotExists)?
        {
            Ok(())
        } else {
            Err(CollectionError::duplicate_key(&field))
        }
    }

    /// Insert or replace an entry (HSET).
    pub fn set(&self, key: &K, value: &V) -> CollectionResult<()> {
        let field = self.options.encode_key(key)?;
        let value = self.options.encode_value(value)?;
        self.store
            .hset(self.key.as_str(), &field, &value, SetCondition::Always)?;
        Ok(())
    }

    /// Look up a value. A missing or empty field is `None`.
    pub fn try_get(&self, key: &K) -> CollectionResult<Option<V>> {
        let field = self.options.encode_key(key)?;
        self.fetch(&field)
    }

    /// Look up a value that must exist.
    pub fn get(&self, key: &K) -> CollectionResult<V> {
        let field = self.options.encode_key(key)?;
        self.fetch(&field)?
            .ok_or_else(|| CollectionError::key_not_found(&field))
    }

    pub fn contains_key(&self, key: &K) -> CollectionResult<bool> {
        let field = self.options.encode_key(key)?;
        Ok(self.store.hexists(self.key.as_str(), &field)?)
    }

    /// Whether `key` is present with a value equal to `value`.
    pub fn contains(&self, key: &K, value: &V) -> CollectionResult<bool>
    where
        V: PartialEq,
    {
        Ok(self.try_get(key)?.as_ref() == Some(value))
    }

    /// Remove an entry. Returns whether a field was deleted.
    pub fn remove(&self, key: &K) -> CollectionResult<bool> {
        let field = self.options.encode_key(key)?;
        Ok(self.store.hdel(self.key.as_str(), &field)?)
    }

    /// Remove `key` only if its current value equals `value`.
    ///
    /// This is HGET followed by HDEL. The two commands are not atomic: a
    /// concurrent writer may replace the value in between, and the new value
    /// is then deleted.
    pub fn remove_entry(&self, key: &K, value: &V) -> CollectionResult<bool>
    where
        V: PartialEq,
    {
        let field = self.options.encode_key(key)?;
        match self.fetch(&field)? {
            Some(current) if current == *value => Ok(self.store.hdel(self.key.as_str(), &field)?),
            _ => Ok(false),
        }
    }

    /// Delete every entry (DEL on the namespace key).
    pub fn clear(&self) -> CollectionResult<()> {
        self.store.del(self.key.as_str())?;
        Ok(())
    }

    /// Number of entries (HLEN).
    pub fn len(&self) -> CollectionResult<usize> {
        Ok(self.store.hlen(self.key.as_str())? as usize)
    }

    /// Same as [`len`](Self::len).
    pub fn count(&self) -> CollectionResult<usize> {
        self.len()
    }

    pub fn is_empty(&self) -> CollectionResult<bool> {
        Ok(self.len()? == 0)
    }

    /// All keys, fetched in one HKEYS.
    pub fn keys(&self) -> CollectionResult<Vec<K>> {
        self.store
            .hkeys(self.key.as_str())?
            .iter()
            .map(|field| self.options.decode_key(field))
            .collect()
    }

    /// All values, fetched in one HVALS.
    pub fn values(&self) -> CollectionResult<Vec<V>> {
        self.store
            .hvals(self.key.as_str())?
            .iter()
            .map(|value| self.options.decode_value(value))
            .collect()
    }

    /// All entries, fetched in one HGETALL.
    pub fn entries(&self) -> CollectionResult<Vec<(K, V)>> {
        self.store
            .hgetall(self.key.as_str())?
            .iter()
            .map(|(field, value)| self.options.decode_entry(field, value))
            .collect()
    }

    /// Write every entry into `buffer` starting at `offset`.
    ///
    /// Entries are fetched once. If `buffer` cannot hold them all from
    /// `offset`, nothing is written and [`CollectionError::BufferTooSmall`]
    /// is returned. Returns the number of slots written.
    pub fn copy_to(&self, buffer: &mut [Option<(K, V)>], offset: usize) -> CollectionResult<usize> {
        let entries = self.entries()?;
        let required = offset.saturating_add(entries.len());
        if required > buffer.len() {
            return Err(CollectionError::BufferTooSmall {
                required,
                available: buffer.len(),
            });
        }

        let written = entries.len();
        for (slot, entry) in buffer[offset..].iter_mut().zip(entries) {
            *slot = Some(entry);
        }
        Ok(written)
    }

    /// Lazily enumerate entries with HSCAN, one page at a time.
    ///
    /// Each call starts a fresh scan. Redis may return an entry more than
    /// once if the hash is modified during the scan.
    pub fn iter(&self) -> Entries<'_, K, V, S, KS, VS> {
        Entries {
            dict: self,
            page: Vec::new().into_iter(),
            cursor: 0,
            done: false,
        }
    }

    /// Insert or replace every pair, stopping at the first failure.
    pub fn try_extend<I>(&self, entries: I) -> CollectionResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.set(&key, &value)?;
        }
        Ok(())
    }

    fn fetch(&self, field: &[u8]) -> CollectionResult<Option<V>> {
        match self.store.hget(self.key.as_str(), field)? {
            Some(data) if !data.is_empty() => Ok(Some(self.options.decode_value(&data)?)),
            _ => Ok(None),
        }
    }
}

/// Iterator returned by [`RedisDictionary::iter`].
pub struct Entries<'a, K, V, S: ?Sized, KS, VS> {
    dict: &'a RedisDictionary<K, V, S, KS, VS>,
    page: std::vec::IntoIter<(Bytes, Bytes)>,
    cursor: u64,
    done: bool,
}

impl<'a, K, V, S, KS, VS> Iterator for Entries<'a, K, V, S, KS, VS>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
    S: HashStore + ?Sized,
    KS: RedisSerializer,
    VS: RedisSerializer,
{
    type Item = CollectionResult<(K, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((field, value)) = self.page.next() {
                return Some(self.dict.options.decode_entry(&field, &value));
            }
            if self.done {
                return None;
            }

            let key = self.dict.key.as_str();
            match self
                .dict
                .store
                .hscan(key, self.cursor, self.dict.options.scan_batch_size)
            {
                Ok(page) => {
                    tracing::trace!(
                        key,
                        cursor = self.cursor,
                        next_cursor = page.cursor,
                        entries = page.entries.len(),
                        "hash scan page"
                    );
                    self.done = page.is_last();
                    self.cursor = page.cursor;
                    self.page = page.entries.into_iter();
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

impl<'a, K, V, S, KS, VS> IntoIterator for &'a RedisDictionary<K, V, S, KS, VS>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
    S: HashStore + ?Sized,
    KS: RedisSerializer,
    VS: RedisSerializer,
{
    type Item = CollectionResult<(K, V)>;
    type IntoIter = Entries<'a, K, V, S, KS, VS>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
