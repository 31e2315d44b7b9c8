//! Async dictionary adapter.
//!
//! Operation for operation the same as [`RedisDictionary`](super::RedisDictionary),
//! but every call is a future that suspends on the store round trip.
//! Dropping a future abandons the call; whether the command still reached
//! the server is up to the store client.

use super::DICTIONARY_TYPE_TAG;
use crate::core::error::{CollectionError, CollectionResult};
use crate::keys::{KeyBuilder, NamespaceKey};
use crate::options::CollectionOptions;
use crate::serializer::{JsonSerializer, RedisSerializer};
use crate::store::{AsyncHashStore, SetCondition};
use bytes::Bytes;
use futures::stream::{self, Stream};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

/// Async dictionary stored in one Redis hash.
pub struct AsyncRedisDictionary<K, V, S: ?Sized, KS = JsonSerializer, VS = JsonSerializer> {
    store: Arc<S>,
    key: NamespaceKey,
    name: String,
    options: Arc<CollectionOptions<KS, VS>>,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, S: ?Sized, KS, VS> Clone for AsyncRedisDictionary<K, V, S, KS, VS> {
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

struct ScanState {
    page: std::vec::IntoIter<(Bytes, Bytes)>,
    cursor: u64,
    done: bool,
}

impl<K, V, S, KS, VS> AsyncRedisDictionary<K, V, S, KS, VS>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
    S: AsyncHashStore + ?Sized,
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

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace_key(&self) -> &NamespaceKey {
        &self.key
    }

    pub fn options(&self) -> &CollectionOptions<KS, VS> {
        &self.options
    }

    /// Insert a new entry with HSETNX; `DuplicateKey` if present.
    pub async fn add(&self, key: &K, value: &V) -> CollectionResult<()> {
        let field = self.options.encode_key(key)?;
        let value = self.options.encode_value(value)?;
        let written = self
            .store
            .hset(self.key.as_str(), &field, &value, SetCondition::NotExists)
            .await?;
        if written {
            Ok(())
        } else {
            Err(CollectionError::duplicate_key(&field))
        }
    }

    /// Insert or replace an entry.
    pub async fn set(&self, key: &K, value: &V) -> CollectionResult<()> {
        let field = self.options.encode_key(key)?;
        let value = self.options.encode_value(value)?;
        self.store
            .hset(self.key.as_str(), &field, &value, SetCondition::Always)
            .await?;
        Ok(())
    }

    pub async fn try_get(&self, key: &K) -> CollectionResult<Option<V>> {
        let field = self.options.encode_key(key)?;
        self.fetch(&field).await
    }

    /// Look up a value that must exist; `KeyNotFound` otherwise.
    pub async fn get(&self, key: &K) -> CollectionResult<V> {
        let field = self.options.encode_key(key)?;
        self.fetch(&field)
            .await?
            .ok_or_else(|| CollectionError::key_not_found(&field))
    }

    pub async fn contains_key(&self, key: &K) -> CollectionResult<bool> {
        let field = self.options.encode_key(key)?;
        Ok(self.store.hexists(self.key.as_str(), &field).await?)
    }

    pub async fn contains(&self, key: &K, value: &V) -> CollectionResult<bool>
    where
        V: PartialEq,
    {
        Ok(self.try_get(key).await?.as_ref() == Some(value))
    }

    pub async fn remove(&self, key: &K) -> CollectionResult<bool> {
        let field = self.options.encode_key(key)?;
        Ok(self.store.hdel(self.key.as_str(), &field).await?)
    }

    /// Remove `key` if its value equals `value`. HGET then HDEL, not atomic.
    pub async fn remove_entry(&self, key: &K, value: &V) -> CollectionResult<bool>
    where
        V: PartialEq,
    {
        let field = self.options.encode_key(key)?;
        match self.fetch(&field).await? {
            Some(current) if current == *value => {
                Ok(self.store.hdel(self.key.as_str(), &field).await?)
            }
            _ => Ok(false),
        }
    }

    pub async fn clear(&self) -> CollectionResult<()> {
        self.store.del(self.key.as_str()).await?;
        Ok(())
    }

    pub async fn len(&self) -> CollectionResult<usize> {
        Ok(self.store.hlen(self.key.as_str()).await? as usize)
    }

    pub async fn count(&self) -> CollectionResult<usize> {
        self.len().await
    }

    pub async fn is_empty(&self) -> CollectionResult<bool> {
        Ok(self.len().await? == 0)
    }

    pub async fn keys(&self) -> CollectionResult<Vec<K>> {
        self.store
            .hkeys(self.key.as_str())
            .await?
            .iter()
            .map(|field| self.options.decode_key(field))
            .collect()
    }

    pub async fn values(&self) -> CollectionResult<Vec<V>> {
        self.store
            .hvals(self.key.as_str())
            .await?
            .iter()
            .map(|value| self.options.decode_value(value))
            .collect()
    }

    pub async fn entries(&self) -> CollectionResult<Vec<(K, V)>> {
        self.store
            .hgetall(self.key.as_str())
            .await?
            .iter()
            .map(|(field, value)| self.options.decode_entry(field, value))
            .collect()
    }

    /// See [`RedisDictionary::copy_to`](super::RedisDictionary::copy_to).
    pub async fn copy_to(
        &self,
        buffer: &mut [Option<(K, V)>],
        offset: usize,
    ) -> CollectionResult<usize> {
        let entries = self.entries().await?;
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

    /// Lazily enumerate entries with HSCAN.
    ///
    /// Polling the stream past the end of the buffered page awaits the next
    /// HSCAN call. A store error ends the stream after it is yielded.
    pub fn stream(&self) -> impl Stream<Item = CollectionResult<(K, V)>> + '_ {
        let initial = ScanState {
            page: Vec::new().into_iter(),
            cursor: 0,
            done: false,
        };

        stream::unfold(initial, move |mut state| async move {
            loop {
                if let Some((field, value)) = state.page.next() {
                    return Some((self.options.decode_entry(&field, &value), state));
                }
                if state.done {
                    return None;
                }

                let key = self.key.as_str();
                match self
                    .store
                    .hscan(key, state.cursor, self.options.scan_batch_size)
                    .await
                {
                    Ok(page) => {
                        tracing::trace!(
                            key,
                            cursor = state.cursor,
                            next_cursor = page.cursor,
                            entries = page.entries.len(),
                            "hash scan page"
                        );
                        state.done = page.is_last();
                        state.cursor = page.cursor;
                        state.page = page.entries.into_iter();
                    }
                    Err(e) => {
                        state.done = true;
                        return Some((Err(e.into()), state));
                    }
                }
            }
        })
    }

    /// Insert or replace every pair in order, stopping at the first failure.
    pub async fn try_extend<I>(&self, entries: I) -> CollectionResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.set(&key, &value).await?;
        }
        Ok(())
    }

    async fn fetch(&self, field: &[u8]) -> CollectionResult<Option<V>> {
        match self.store.hget(self.key.as_str(), field).await? {
            Some(data) if !data.is_empty() => Ok(Some(self.options.decode_value(&data)?)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryHashStore;
    use futures::{StreamExt, TryStreamExt};
    use std::collections::BTreeMap;

    fn dict(store: &Arc<MemoryHashStore>) -> AsyncRedisDictionary<String, i64, MemoryHashStore> {
        let options = <CollectionOptions>::default().with_scan_batch_size(3);
        AsyncRedisDictionary::new(Arc::clone(store), "scores", Arc::new(options))
    }

    #[tokio::test]
    async fn test_add_and_duplicate() {
        let store = Arc::new(MemoryHashStore::new());
        let d = dict(&store);

        d.add(&"alice".to_string(), &10).await.unwrap();
        assert!(matches!(
            d.add(&"alice".to_string(), &20).await,
            Err(CollectionError::DuplicateKey { .. })
        ));
        assert_eq!(d.get(&"alice".to_string()).await.unwrap(), 10);
        assert_eq!(d.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stream_spans_pages() {
        let store = Arc::new(MemoryHashStore::new());
        let d = dict(&store);
        d.try_extend((0..10).map(|i| (format!("p{}", i), i)))
            .await
            .unwrap();

        let collected: BTreeMap<String, i64> = d.stream().try_collect().await.unwrap();
        assert_eq!(collected.len(), 10);
        assert_eq!(collected.get("p7"), Some(&7));

        // Restartable: a second stream scans from the beginning.
        assert_eq!(d.stream().count().await, 10);
    }

    #[tokio::test]
    async fn test_remove_entry_and_clear() {
        let store = Arc::new(MemoryHashStore::new());
        let d = dict(&store);
        d.set(&"a".to_string(), &1).await.unwrap();
        d.set(&"b".to_string(), &2).await.unwrap();

        assert!(!d.remove_entry(&"a".to_string(), &5).await.unwrap());
        assert!(d.remove_entry(&"a".to_string(), &1).await.unwrap());
        assert!(d.contains(&"b".to_string(), &2).await.unwrap());

        d.clear().await.unwrap();
        assert!(d.is_empty().await.unwrap());
        assert!(!store.contains_key("IDictionary+scores"));
    }
}
