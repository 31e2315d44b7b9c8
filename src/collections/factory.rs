//! Adapter factory.

use super::{AsyncRedisDictionary, RedisDictionary};
use crate::core::config::CollectionsConfig;
use crate::options::CollectionOptions;
use crate::serializer::{FormatSerializer, JsonSerializer, RedisSerializer};
use crate::store::{AsyncHashStore, HashStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Binds a store client and options, and hands out dictionaries by name.
///
/// Creating an adapter never touches the network. Every adapter shares the
/// factory's store handle and options.
pub struct CollectionFactory<S: ?Sized, KS = JsonSerializer, VS = JsonSerializer> {
    store: Arc<S>,
    options: Arc<CollectionOptions<KS, VS>>,
}

impl<S: ?Sized, KS, VS> Clone for CollectionFactory<S, KS, VS> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            options: Arc::clone(&self.options),
        }
    }
}

impl<S: ?Sized> CollectionFactory<S> {
    /// Factory with JSON key and value serializers.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            options: Arc::new(CollectionOptions::default()),
        }
    }
}

impl<S: ?Sized> CollectionFactory<S, FormatSerializer, FormatSerializer> {
    /// Factory using the serializers and scan hint from `[collections]`.
    pub fn from_config(store: Arc<S>, config: &CollectionsConfig) -> Self {
        Self {
            store,
            options: Arc::new(CollectionOptions::from_config(config)),
        }
    }
}

impl<S, KS, VS> CollectionFactory<S, KS, VS>
where
    S: ?Sized,
    KS: RedisSerializer,
    VS: RedisSerializer,
{
    /// Replace the options used by adapters created from now on.
    pub fn with_options<NK, NV>(
        self,
        options: CollectionOptions<NK, NV>,
    ) -> CollectionFactory<S, NK, NV>
    where
        NK: RedisSerializer,
        NV: RedisSerializer,
    {
        CollectionFactory {
            store: self.store,
            options: Arc::new(options),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn options(&self) -> &CollectionOptions<KS, VS> {
        &self.options
    }

    /// Blocking dictionary called `name`.
    pub fn create_dict<K, V>(&self, name: &str) -> RedisDictionary<K, V, S, KS, VS>
    where
        K: Serialize + DeserializeOwned,
        V: Serialize + DeserializeOwned,
        S: HashStore,
    {
        let dict = RedisDictionary::new(Arc::clone(&self.store), name, Arc::clone(&self.options));
        tracing::debug!(name, key = %dict.namespace_key(), "dictionary created");
        dict
    }

    /// Async dictionary called `name`. Shares entries with
    /// [`create_dict`](Self::create_dict) for the same name.
    pub fn create_dict_async<K, V>(&self, name: &str) -> AsyncRedisDictionary<K, V, S, KS, VS>
    where
        K: Serialize + DeserializeOwned,
        V: Serialize + DeserializeOwned,
        S: AsyncHashStore,
    {
        let dict =
            AsyncRedisDictionary::new(Arc::clone(&self.store), name, Arc::clone(&self.options));
        tracing::debug!(name, key = %dict.namespace_key(), "async dictionary created");
        dict
    }
}
