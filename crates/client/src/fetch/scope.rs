//! Interception scope: which requests the worker handles at all.
//!
//! Same-origin GET requests are intercepted, plus GETs to a configurable
//! allow-list of cross-origin hosts treated as the application's data
//! backend (matched by hostname substring). Everything else passes
//! straight to the network without interception. An origin is the full
//! (scheme, host, port) triple; a different scheme or port on the same
//! hostname is a different origin.

use offcache_core::{AppConfig, Error};
use url::Url;

/// Rules deciding whether a request enters the cache layer.
#[derive(Debug, Clone)]
pub struct InterceptScope {
    origin_scheme: String,
    origin_host: String,
    origin_port: Option<u16>,
    api_hosts: Vec<String>,
}

impl InterceptScope {
    /// Build the scope from the application origin and data-host allow-list.
    pub fn new(origin: &str, api_hosts: Vec<String>) -> Result<Self, Error> {
        let parsed = Url::parse(origin).map_err(|e| Error::InvalidUrl(format!("origin: {e}")))?;
        let origin_host = parsed
            .host_str()
            .ok_or_else(|| Error::InvalidUrl("origin has no host".to_string()))?
            .to_lowercase();
        Ok(Self {
            origin_scheme: parsed.scheme().to_string(),
            origin_host,
            origin_port: parsed.port_or_known_default(),
            api_hosts,
        })
    }

    /// Build the scope from loaded configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Self::new(&config.origin, config.api_hosts.clone())
    }

    /// True if the URL shares the application origin: scheme, host, and
    /// port must all match (default ports count as equal to explicit ones).
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.scheme() == self.origin_scheme
            && url.host_str().is_some_and(|h| h.eq_ignore_ascii_case(&self.origin_host))
            && url.port_or_known_default() == self.origin_port
    }

    /// True if the URL's host matches the data-backend allow-list
    /// (hostname substring match).
    pub fn is_data_host(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_lowercase();
        self.api_hosts.iter().any(|allowed| host.contains(&allowed.to_lowercase()))
    }

    /// True if the worker intercepts this request at all.
    ///
    /// Non-GET requests and cross-origin requests outside the allow-list
    /// bypass the cache layer entirely.
    pub fn intercepts(&self, method: &str, url: &Url) -> bool {
        if !method.eq_ignore_ascii_case("GET") {
            return false;
        }
        self.is_same_origin(url) || self.is_data_host(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> InterceptScope {
        InterceptScope::new("https://app.example.com", vec!["api.backend.io".to_string()]).unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_same_origin_get_intercepted() {
        assert!(scope().intercepts("GET", &url("https://app.example.com/index.html")));
    }

    #[test]
    fn test_non_get_bypasses() {
        assert!(!scope().intercepts("POST", &url("https://app.example.com/api/items")));
        assert!(!scope().intercepts("DELETE", &url("https://app.example.com/api/items/1")));
    }

    #[test]
    fn test_allowlisted_data_host_intercepted() {
        assert!(scope().intercepts("GET", &url("https://api.backend.io/v1/items")));
        // Substring match covers environment-prefixed hosts.
        assert!(scope().intercepts("GET", &url("https://staging.api.backend.io/v1/items")));
    }

    #[test]
    fn test_foreign_origin_bypasses() {
        assert!(!scope().intercepts("GET", &url("https://cdn.thirdparty.net/lib.js")));
    }

    #[test]
    fn test_scheme_mismatch_is_cross_origin() {
        let s = scope();
        assert!(!s.is_same_origin(&url("http://app.example.com/x")));
        assert!(!s.intercepts("GET", &url("http://app.example.com/x")));
    }

    #[test]
    fn test_port_mismatch_is_cross_origin() {
        let s = scope();
        assert!(!s.is_same_origin(&url("https://app.example.com:8443/x")));
        assert!(!s.intercepts("GET", &url("https://app.example.com:8443/x")));
    }

    #[test]
    fn test_explicit_default_port_is_same_origin() {
        assert!(scope().is_same_origin(&url("https://app.example.com:443/x")));
    }

    #[test]
    fn test_host_case_insensitive() {
        let s = InterceptScope::new("https://App.Example.com", vec![]).unwrap();
        assert!(s.is_same_origin(&url("https://app.example.com/")));
    }

    #[test]
    fn test_invalid_origin_rejected() {
        assert!(InterceptScope::new("not a url", vec![]).is_err());
    }
}
