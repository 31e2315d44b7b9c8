//! Error types for collections and the remote stores behind them.
//!
//! Collection errors are surfaced to the immediate caller and never logged or
//! retried here. Remote failures travel inside [`CollectionError::Store`]
//! without translation so callers can apply their own retry policy.

use thiserror::Error;

/// Errors raised by dictionary operations.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// `add` found the field already present; the existing entry is untouched.
    #[error("an item with the same key has already been added (field={field})")]
    DuplicateKey { field: String },

    /// Indexed get on a key with no entry.
    #[error("key not found in dictionary (field={field})")]
    KeyNotFound { field: String },

    /// Stored data could not be converted to the requested type.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A value could not be represented in the wire format.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// `copy_to` target cannot hold the remote entries at the given offset.
    #[error("buffer too small: {required} slots required, {available} available")]
    BufferTooSmall { required: usize, available: usize },

    /// Failure reported by the remote store client.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CollectionError {
    /// Create a DuplicateKey error for a serialized field.
    pub fn duplicate_key(field: &[u8]) -> Self {
        Self::DuplicateKey {
            field: String::from_utf8_lossy(field).into_owned(),
        }
    }

    /// Create a KeyNotFound error for a serialized field.
    pub fn key_not_found(field: &[u8]) -> Self {
        Self::KeyNotFound {
            field: String::from_utf8_lossy(field).into_owned(),
        }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Only remote failures can be transient; contract violations never are.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retriable(),
            _ => false,
        }
    }
}

/// Wire data did not conform to the encoding or to the target type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to decode {format} value: {message}")]
pub struct DecodeError {
    /// Serializer format name.
    pub format: &'static str,
    /// Underlying decoder message.
    pub message: String,
}

impl DecodeError {
    /// Create a new decode error.
    pub fn new(format: &'static str, message: impl Into<String>) -> Self {
        Self {
            format,
            message: message.into(),
        }
    }
}

/// A value has no representation in the chosen wire format.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to encode {format} value: {message}")]
pub struct EncodeError {
    /// Serializer format name.
    pub format: &'static str,
    /// Underlying encoder message.
    pub message: String,
}

impl EncodeError {
    /// Create a new encode error.
    pub fn new(format: &'static str, message: impl Into<String>) -> Self {
        Self {
            format,
            message: message.into(),
        }
    }
}

/// Errors reported by a remote hash store client.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The request did not complete within the configured timeout.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// Malformed RESP frame.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Error reply from the server (`-KIND message`).
    #[error("{kind} {message}")]
    Server { kind: String, message: String },

    /// A reply arrived with a shape the command never produces.
    #[error("unexpected reply to {command}: {reply}")]
    UnexpectedReply {
        command: &'static str,
        reply: String,
    },

    /// The connection is no longer usable.
    #[error("connection closed")]
    Closed,
}

impl StoreError {
    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create an error for a reply of the wrong shape.
    pub fn unexpected(command: &'static str, reply: impl std::fmt::Debug) -> Self {
        Self::UnexpectedReply {
            command,
            reply: format!("{:?}", reply),
        }
    }

    /// Check if this error indicates the operation could be retried.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Io(_) | Self::Timeout { .. } | Self::Closed => true,
            Self::Server { kind, .. } => {
                matches!(kind.as_str(), "BUSY" | "LOADING" | "TRYAGAIN")
            }
            Self::Protocol { .. } | Self::UnexpectedReply { .. } => false,
        }
    }
}

/// Result type using CollectionError.
pub type CollectionResult<T> = Result<T, CollectionError>;

/// Result type using StoreError.
pub type StoreResult<T> = Result<T, StoreError>;
