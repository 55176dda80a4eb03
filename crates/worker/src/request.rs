//! Intercepted requests as seen by the worker.

use offcache_client::canonicalize;
use offcache_core::cache::identity::request_identity;
use offcache_core::Error;
use url::Url;

/// How the host page issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Top-level document load. Failures fall back to the offline document.
    Navigate,
    /// Script, style, image, data call, etc.
    SubResource,
}

/// One request passing through the worker.
#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
}

impl WorkerRequest {
    pub fn new(method: impl Into<String>, url: Url, mode: RequestMode) -> Self {
        Self { method: method.into().to_ascii_uppercase(), url, mode }
    }

    /// A plain sub-resource GET.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url, RequestMode::SubResource)
    }

    /// A top-level navigation.
    pub fn navigate(url: Url) -> Self {
        Self::new("GET", url, RequestMode::Navigate)
    }

    /// Parse a raw URL string, canonicalizing it so equal requests get
    /// equal identities.
    pub fn parse(method: &str, raw_url: &str, mode: RequestMode) -> Result<Self, Error> {
        let url = canonicalize(raw_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::new(method, url, mode))
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Identity key of this request in the cache store.
    pub fn identity(&self) -> String {
        request_identity(&self.method, self.url.as_str())
    }
}
