//! Responses synthesized, replayed, or relayed by the worker.

use bytes::Bytes;
use offcache_client::FetchResponse;
use offcache_core::CacheEntry;
use serde::Serialize;

/// Placeholder shown when a navigation fails and the offline document
/// itself was never cached.
const BUILTIN_OFFLINE_HTML: &str = "<!doctype html><html><head><title>Offline</title></head>\
     <body><h1>You are offline</h1><p>This page is not available without a network connection.</p></body></html>";

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Fresh from the network.
    Network,
    /// Replayed from the cache store.
    Cache,
    /// Synthesized offline fallback.
    Fallback,
}

/// Structured body for data-endpoint failures, so calling code can tell
/// "offline" apart from a server error.
#[derive(Debug, Serialize)]
struct OfflineBody<'a> {
    error: &'static str,
    message: &'a str,
}

/// The response handed back to the host page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl WorkerResponse {
    /// Relay a network response.
    pub fn from_network(resp: &FetchResponse) -> Self {
        Self {
            status: resp.status.as_u16(),
            content_type: resp.content_type.clone(),
            body: resp.bytes.clone(),
            source: ResponseSource::Network,
        }
    }

    /// Replay a stored entry.
    pub fn from_entry(entry: &CacheEntry) -> Self {
        Self {
            status: entry.status,
            content_type: entry.content_type.clone(),
            body: Bytes::from(entry.body.clone()),
            source: ResponseSource::Cache,
        }
    }

    /// Offline document for failed navigations.
    ///
    /// Serves the precached document when available, otherwise a built-in
    /// placeholder with status 503.
    pub fn fallback_document(cached: Option<&CacheEntry>) -> Self {
        match cached {
            Some(entry) => Self { source: ResponseSource::Fallback, ..Self::from_entry(entry) },
            None => Self {
                status: 503,
                content_type: Some("text/html".to_string()),
                body: Bytes::from_static(BUILTIN_OFFLINE_HTML.as_bytes()),
                source: ResponseSource::Fallback,
            },
        }
    }

    /// Structured 503 for data-endpoint requests when both network and
    /// cache fail.
    pub fn offline_json(message: &str) -> Self {
        let body = OfflineBody { error: "offline", message };
        // Serializing two string fields cannot fail.
        let json = serde_json::to_vec(&body).unwrap_or_default();
        Self {
            status: 503,
            content_type: Some("application/json".to_string()),
            body: Bytes::from(json),
            source: ResponseSource::Fallback,
        }
    }

    /// Bare 503 for failed sub-resources.
    pub fn synthesized_503() -> Self {
        Self {
            status: 503,
            content_type: Some("text/plain".to_string()),
            body: Bytes::from_static(b"offline"),
            source: ResponseSource::Fallback,
        }
    }

    /// Body as UTF-8, for logging and assertions.
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
