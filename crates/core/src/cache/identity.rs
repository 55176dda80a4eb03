//! Request-identity key generation.
//!
//! A cache entry is keyed by the canonicalized method and URL of a GET
//! request. The identity is hashed so keys stay fixed-width regardless of
//! query-string length; the canonical URL itself is stored alongside the
//! entry for introspection.

use sha2::{Digest, Sha256};

/// Compute the identity key for a request.
///
/// The method is case-folded so "get" and "GET" map to the same entry.
pub fn request_identity(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
