//! Postcard binary serializer.

use super::RedisSerializer;
use crate::core::error::{DecodeError, EncodeError};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Compact binary encoding. Not self-describing: the reader must request the
/// same type the writer stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostcardSerializer;

impl PostcardSerializer {
    /// Format name.
    pub const FORMAT: &'static str = "postcard";
}

impl RedisSerializer for PostcardSerializer {
    fn format_name(&self) -> &'static str {
        Self::FORMAT
    }

    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes, EncodeError> {
        ::postcard::to_stdvec(value)
            .map(Bytes::from)
            .map_err(|e| EncodeError::new(Self::FORMAT, e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, DecodeError> {
        let (value, rest) = ::postcard::take_from_bytes::<T>(data)
            .map_err(|e| DecodeError::new(Self::FORMAT, e.to_string()))?;
        if !rest.is_empty() {
            return Err(DecodeError::new(
                Self::FORMAT,
                format!("{} trailing bytes after value", rest.len()),
            ));
        }
        Ok(value)
    }
}
