//! Collection options.
//!
//! Options are fixed when an adapter is built and shared read-only for its
//! lifetime.

use crate::core::config::{default_scan_batch_size, CollectionsConfig};
use crate::core::error::CollectionResult;
use crate::serializer::{FormatSerializer, JsonSerializer, RedisSerializer};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Key/value serializers and the enumeration batch hint.
#[derive(Debug, Clone)]
pub struct CollectionOptions<KS = JsonSerializer, VS = JsonSerializer> {
    /// Serializer for dictionary keys (Redis hash fields).
    pub key_serializer: KS,

    /// Serializer for dictionary values.
    pub value_serializer: VS,

    /// COUNT hint passed to HSCAN while enumerating. Redis treats it as
    /// advisory; pages may be larger or smaller.
    pub scan_batch_size: usize,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self::new(JsonSerializer, JsonSerializer)
    }
}

impl<KS: RedisSerializer, VS: RedisSerializer> CollectionOptions<KS, VS> {
    /// Create options with the given serializers.
    pub fn new(key_serializer: KS, value_serializer: VS) -> Self {
        Self {
            key_serializer,
            value_serializer,
            scan_batch_size: default_scan_batch_size(),
        }
    }

    /// Replace the key serializer.
    pub fn with_key_serializer<NK: RedisSerializer>(
        self,
        key_serializer: NK,
    ) -> CollectionOptions<NK, VS> {
        CollectionOptions {
            key_serializer,
            value_serializer: self.value_serializer,
            scan_batch_size: self.scan_batch_size,
        }
    }

    /// Replace the value serializer.
    pub fn with_value_serializer<NV: RedisSerializer>(
        self,
        value_serializer: NV,
    ) -> CollectionOptions<KS, NV> {
        CollectionOptions {
            key_serializer: self.key_serializer,
            value_serializer,
            scan_batch_size: self.scan_batch_size,
        }
    }

    /// Set the HSCAN batch hint (clamped to at least 1).
    pub fn with_scan_batch_size(mut self, scan_batch_size: usize) -> Self {
        self.scan_batch_size = scan_batch_size.max(1);
        self
    }

    pub(crate) fn encode_key<K: Serialize>(&self, key: &K) -> CollectionResult<Bytes> {
        Ok(self.key_serializer.serialize(key)?)
    }

    pub(crate) fn encode_value<V: Serialize>(&self, value: &V) -> CollectionResult<Bytes> {
        Ok(self.value_serializer.serialize(value)?)
    }

    pub(crate) fn decode_key<K: DeserializeOwned>(&self, field: &[u8]) -> CollectionResult<K> {
        Ok(self.key_serializer.deserialize(field)?)
    }

    pub(crate) fn decode_value<V: DeserializeOwned>(&self, value: &[u8]) -> CollectionResult<V> {
        Ok(self.value_serializer.deserialize(value)?)
    }

    pub(crate) fn decode_entry<K, V>(&self, field: &[u8], value: &[u8]) -> CollectionResult<(K, V)>
    where
        K: DeserializeOwned,
        V: DeserializeOwned,
    {
        Ok((self.decode_key(field)?, self.decode_value(value)?))
    }
}

impl CollectionOptions<FormatSerializer, FormatSerializer> {
    /// Build options from the `[collections]` configuration section.
    pub fn from_config(config: &CollectionsConfig) -> Self {
        Self::new(
            FormatSerializer::from(config.key_serializer),
            FormatSerializer::from(config.value_serializer),
        )
        .with_scan_batch_size(config.scan_batch_size)
    }
}
