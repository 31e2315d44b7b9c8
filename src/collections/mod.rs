//! Dictionary adapters over a remote hash.
//!
//! An adapter holds no entries. It keeps a store handle, the namespace key
//! and shared options, and turns each dictionary operation into one hash
//! primitive (a short fixed sequence for `contains` and `remove_entry`).
//! Dropping an adapter leaves the remote data in place; only `clear` deletes
//! it.

pub mod async_dictionary;
pub mod dictionary;
pub mod factory;

pub use async_dictionary::AsyncRedisDictionary;
pub use dictionary::{Entries, RedisDictionary};
pub use factory::CollectionFactory;

/// Type tag for dictionaries. The sync and async adapters share it, so both
/// see the same entries for a given name.
pub const DICTIONARY_TYPE_TAG: &str = "IDictionary";
