//! Namespace key derivation.
//!
//! Every dictionary lives under one Redis key derived from a collection type
//! tag and an instance name. Two adapters built from the same pair address the
//! same remote entries, in any process.
//!
//! The layout is `<tag>+<name>`. Backslashes and `+` inside the tag are escaped
//! so the first unescaped `+` always ends the tag, which keeps distinct pairs
//! on distinct keys.

use std::fmt;

/// Key of the remote hash holding one logical collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceKey(String);

impl NamespaceKey {
    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the key as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for NamespaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NamespaceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds namespace keys.
pub struct KeyBuilder;

impl KeyBuilder {
    /// Separator between type tag and instance name.
    pub const SEPARATOR: char = '+';

    /// Derive the namespace key for `(type_tag, name)`.
    pub fn build(type_tag: &str, name: &str) -> NamespaceKey {
        let mut key = String::with_capacity(type_tag.len() + name.len() + 1);
        for c in type_tag.chars() {
            if c == '\\' || c == Self::SEPARATOR {
                key.push('\\');
            }
            key.push(c);
        }
        key.push(Self::SEPARATOR);
        key.push_str(name);
        NamespaceKey(key)
    }
}
