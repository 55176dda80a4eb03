//! SQLite-backed versioned cache store for intercepted responses.
//!
//! This module provides a persistent key/value store using SQLite with
//! async access via tokio-rusqlite. It supports:
//!
//! - Versioned namespaces (one per cache generation)
//! - Request-identity keys derived from SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Bulk namespace deletion for activation-time garbage collection

pub mod connection;
pub mod entries;
pub mod identity;
pub mod migrations;
pub mod namespace;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheEntry, NamespaceStats};
pub use namespace::CacheNamespace;
