//! Versioned cache namespaces.
//!
//! A namespace is derived deterministically from the application name and
//! the cache version. Namespaces are immutable once created: a new version
//! always produces a new namespace rather than mutating the old one, and
//! the old one is only ever deleted wholesale at activation time.

use serde::{Deserialize, Serialize};

/// Name of one versioned, isolated region of the cache store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheNamespace(String);

impl CacheNamespace {
    /// Derive the namespace for an application and cache version.
    pub fn new(app_name: &str, version: &str) -> Self {
        Self(format!("{app_name}-{version}"))
    }

    /// Wrap a name read back from the store.
    pub fn from_name(name: &str) -> Self {
        Self(name.to_string())
    }

    /// The raw store name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
