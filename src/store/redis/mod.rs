//! Redis hash store over RESP2.
//!
//! A deliberately small client: it sends the hash commands the collections
//! need and reads their replies. There is no pooling, pipelining or
//! reconnect. A connection that hit an I/O error, a timeout or a cancelled
//! request is marked broken and every later call fails with
//! [`StoreError::Closed`](crate::core::error::StoreError::Closed); callers
//! decide whether to connect again.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  RedisDictionary / AsyncRedisDictionary       │
//! └───────────────────────────────────────────────┘
//!                        │ HashStore / AsyncHashStore
//! ┌───────────────────────────────────────────────┐
//! │  RedisConnection / AsyncRedisConnection       │
//! │    commands: Command builders, reply shapes   │
//! │    protocol: RESP2 encoder + parser           │
//! └───────────────────────────────────────────────┘
//!                        │ TCP
//!                  Redis server
//! ```

pub mod async_connection;
pub mod commands;
pub mod connection;
pub mod protocol;

pub use async_connection::AsyncRedisConnection;
pub use commands::Command;
pub use connection::RedisConnection;
pub use protocol::{ParseResult, ParserLimits, Resp2Decoder, Resp2Encoder, Resp2Parser};

use crate::core::error::StoreError;
use bytes::Bytes;

/// RESP2 value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Simple string (+OK\r\n)
    SimpleString(String),

    /// Error (-ERR message\r\n)
    Error(RespError),

    /// Integer (:1000\r\n)
    Integer(i64),

    /// Bulk string ($6\r\nfoobar\r\n)
    BulkString(Bytes),

    /// Array (*2\r\n...)
    Array(Vec<RespValue>),

    /// Null bulk string or null array ($-1\r\n, *-1\r\n)
    Null,
}

impl RespValue {
    /// Create an OK reply.
    pub fn ok() -> Self {
        Self::SimpleString("OK".to_string())
    }

    /// Create an error reply.
    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error(RespError::new(kind, message))
    }

    /// Create a bulk string.
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Self::BulkString(data.into())
    }

    /// Create an array.
    pub fn array(items: Vec<RespValue>) -> Self {
        Self::Array(items)
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get as integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::SimpleString(s) => s.parse().ok(),
            Self::BulkString(b) => std::str::from_utf8(b).ok().and_then(|s| s.parse().ok()),
            _ => None,
        }
    }

    /// Convert to bytes, consuming self.
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            Self::BulkString(b) => Some(b),
            Self::SimpleString(s) => Some(Bytes::from(s)),
            _ => None,
        }
    }

    /// Convert to array, consuming self.
    pub fn into_array(self) -> Option<Vec<RespValue>> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Turn an error reply into `StoreError::Server`, passing other values through.
    pub fn into_result(self) -> Result<Self, StoreError> {
        match self {
            Self::Error(e) => Err(e.into()),
            other => Ok(other),
        }
    }
}

/// Error reply sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RespError {
    /// Error kind (ERR, WRONGTYPE, NOAUTH, etc.)
    pub kind: String,
    /// Error message.
    pub message: String,
}

impl RespError {
    /// Create a new error.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl From<RespError> for StoreError {
    fn from(e: RespError) -> Self {
        StoreError::Server {
            kind: e.kind,
            message: e.message,
        }
    }
}
