//! Core types and shared functionality for offcache.
//!
//! This crate provides:
//! - Versioned, namespaced cache store with SQLite backend
//! - Unified error types
//! - Layered application configuration

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheEntry, CacheNamespace, NamespaceStats};
pub use config::AppConfig;
pub use error::Error;
