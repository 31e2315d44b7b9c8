//! Remote collections - dictionaries backed by Redis hashes.
//!
//! A dictionary here holds no entries of its own. Each operation is mapped
//! onto one Redis hash primitive addressed by a namespace key, so the remote
//! store owns the data and enforces key uniqueness. Keys and values cross
//! the boundary through pluggable serializers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       CollectionFactory                         │
//! │            store handle + CollectionOptions (shared)            │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │ create_dict / create_dict_async
//! ┌─────────────────────────────────────────────────────────────────┐
//! │          RedisDictionary        │      AsyncRedisDictionary     │
//! │     KeyBuilder │ key serializer │ value serializer │ HSCAN iter │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │ HashStore / AsyncHashStore
//! ┌─────────────────────────────────────────────────────────────────┐
//! │   MemoryHashStore   │   RedisConnection / AsyncRedisConnection  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! ## Core
//! - [`core::config`] - Configuration parsing and validation
//! - [`core::error`] - Error types
//! - [`core::telemetry`] - Tracing subscriber setup
//!
//! ## Collections
//! - [`keys`] - Namespace key derivation
//! - [`serializer`] - Serializer contract and formats
//! - [`options`] - Collection options
//! - [`collections`] - Dictionary adapters and factory
//!
//! ## Stores
//! - [`store`] - Hash store traits
//! - [`store::memory`] - In-process store
//! - [`store::redis`] - RESP2 client
//!
//! # Example
//!
//! ```
//! use remote_collections::{CollectionFactory, MemoryHashStore};
//! use std::sync::Arc;
//!
//! let factory = CollectionFactory::new(Arc::new(MemoryHashStore::new()));
//! let users = factory.create_dict::<String, u32>("users");
//!
//! users.add(&"alice".to_string(), &42)?;
//! assert_eq!(users.try_get(&"alice".to_string())?, Some(42));
//! # Ok::<(), remote_collections::CollectionError>(())
//! ```

// Core infrastructure
pub mod core;

// Collection building blocks
pub mod keys;
pub mod options;
pub mod serializer;

// Remote stores
pub mod store;

// Adapters
pub mod collections;

// Re-exports for convenience
pub use self::core::config::ClientConfig;
pub use self::core::error::{CollectionError, CollectionResult, StoreError, StoreResult};
pub use collections::{AsyncRedisDictionary, CollectionFactory, RedisDictionary};
pub use keys::{KeyBuilder, NamespaceKey};
pub use options::CollectionOptions;
pub use serializer::{FormatSerializer, JsonSerializer, PostcardSerializer, RedisSerializer};
pub use store::{AsyncHashStore, AsyncRedisConnection, HashStore, MemoryHashStore, RedisConnection};
