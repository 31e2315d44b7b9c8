//! Conversion between typed values and Redis field/value bytes.
//!
//! A serializer instance is not bound to one type: [`RedisSerializer`] has
//! generic methods, so the same instance converts whatever type the caller
//! names at each call site. Adapters rely on two properties only:
//!
//! - `deserialize(serialize(v)) == v`
//! - for keys, equal values produce equal bytes (Redis matches fields by byte equality)
//!
//! Key types whose serde output depends on iteration order (e.g. `HashMap`)
//! break the second property with every format here.

mod json;
mod postcard;

pub use self::json::JsonSerializer;
pub use self::postcard::PostcardSerializer;

use crate::core::error::{DecodeError, EncodeError};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serializer contract used for dictionary keys and values.
pub trait RedisSerializer: Send + Sync {
    /// Short format name used in errors and logs.
    fn format_name(&self) -> &'static str;

    /// Encode a value.
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes, EncodeError>;

    /// Decode a value of the requested type.
    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, DecodeError>;
}

/// Serializer formats selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerKind {
    /// Self-describing JSON text.
    #[default]
    Json,
    /// Compact postcard binary.
    Postcard,
}

impl fmt::Display for SerializerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Postcard => write!(f, "postcard"),
        }
    }
}

/// Serializer whose format is chosen at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSerializer {
    Json(JsonSerializer),
    Postcard(PostcardSerializer),
}

impl FormatSerializer {
    /// Get the kind of this serializer.
    pub fn kind(&self) -> SerializerKind {
        match self {
            Self::Json(_) => SerializerKind::Json,
            Self::Postcard(_) => SerializerKind::Postcard,
        }
    }
}

impl Default for FormatSerializer {
    fn default() -> Self {
        Self::from(SerializerKind::default())
    }
}

impl From<SerializerKind> for FormatSerializer {
    fn from(kind: SerializerKind) -> Self {
        match kind {
            SerializerKind::Json => Self::Json(JsonSerializer),
            SerializerKind::Postcard => Self::Postcard(PostcardSerializer),
        }
    }
}

impl RedisSerializer for FormatSerializer {
    fn format_name(&self) -> &'static str {
        match self {
            Self::Json(s) => s.format_name(),
            Self::Postcard(s) => s.format_name(),
        }
    }

    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes, EncodeError> {
        match self {
            Self::Json(s) => s.serialize(value),
            Self::Postcard(s) => s.serialize(value),
        }
    }

    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, DecodeError> {
        match self {
            Self::Json(s) => s.deserialize(data),
            Self::Postcard(s) => s.deserialize(data),
        }
    }
}
