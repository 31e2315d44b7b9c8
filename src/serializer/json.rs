//! JSON serializer (the default).

use super::RedisSerializer;
use crate::core::error::{DecodeError, EncodeError};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Human-readable, schema-less JSON text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonSerializer;

impl JsonSerializer {
    /// Format name.
    pub const FORMAT: &'static str = "json";
}

impl RedisSerializer for JsonSerializer {
    fn format_name(&self) -> &'static str {
        Self::FORMAT
    }

    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes, EncodeError> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| EncodeError::new(Self::FORMAT, e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, DecodeError> {
        serde_json::from_slice(data).map_err(|e| DecodeError::new(Self::FORMAT, e.to_string()))
    }
}
