//! Network side of offcache.
//!
//! This crate provides the HTTP fetch pipeline the strategy executors run
//! against, URL canonicalization for stable request identities, and the
//! interception-scope rules deciding which requests the worker handles.

pub mod fetch;

pub use fetch::scope::InterceptScope;
pub use fetch::url::{UrlError, canonicalize};
pub use fetch::{FetchClient, FetchConfig, FetchResponse, Fetcher};

// Re-exported so downstream crates (and their tests) can build
// `FetchResponse` values without a direct reqwest dependency.
pub use reqwest::StatusCode;
pub use reqwest::header::HeaderMap;
