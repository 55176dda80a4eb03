//! Strategy executors: Cache-First, Network-First, Stale-While-Revalidate.
//!
//! Each executor is an async function of request -> response. Within one
//! request the cache read, network fetch, and cache write are ordered as
//! written; across concurrent requests the store's last-write-wins UPSERT
//! decides the final entry. Cache writes that must not delay the response
//! go through the detached [`TaskQueue`]. Storage failures are logged and
//! swallowed; the response in flight is always returned.

use std::collections::BTreeMap;
use std::sync::Arc;

use offcache_client::{FetchResponse, Fetcher};
use offcache_core::cache::identity::request_identity;
use offcache_core::{CacheDb, CacheEntry, CacheNamespace};
use url::Url;

use crate::request::WorkerRequest;
use crate::response::WorkerResponse;
use crate::router::{RequestClass, Strategy};
use crate::tasks::TaskQueue;

/// Executes the caching strategies against one namespace.
pub struct StrategyExecutor {
    db: CacheDb,
    namespace: CacheNamespace,
    fetcher: Arc<dyn Fetcher>,
    tasks: Arc<TaskQueue>,
    offline_doc_identity: String,
}

impl StrategyExecutor {
    pub fn new(
        db: CacheDb, namespace: CacheNamespace, fetcher: Arc<dyn Fetcher>, tasks: Arc<TaskQueue>,
        offline_doc_url: &Url,
    ) -> Self {
        let offline_doc_identity = request_identity("GET", offline_doc_url.as_str());
        Self { db, namespace, fetcher, tasks, offline_doc_identity }
    }

    /// Run one strategy for one request.
    pub async fn execute(&self, strategy: Strategy, class: RequestClass, req: &WorkerRequest) -> WorkerResponse {
        match strategy {
            Strategy::CacheFirst => self.cache_first(req, class).await,
            Strategy::NetworkFirst => self.network_first(req, class).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(req, class).await,
            Strategy::NetworkOnly => self.network_only(req, class).await,
        }
    }

    /// Cached entry wins without touching the network; a miss goes to the
    /// network with a fire-and-forget write of any 2xx result.
    async fn cache_first(&self, req: &WorkerRequest, class: RequestClass) -> WorkerResponse {
        if let Some(entry) = self.cached(req).await {
            return WorkerResponse::from_entry(&entry);
        }

        match self.fetcher.get(&req.url).await {
            Ok(resp) => {
                if resp.is_cacheable() {
                    self.store_detached(req, &resp);
                }
                WorkerResponse::from_network(&resp)
            }
            Err(e) => {
                tracing::debug!(url = %req.url, error = %e, "cache-first miss and network failed");
                self.offline_fallback(req, class).await
            }
        }
    }

    /// Network wins; a transport failure or 5xx falls back to the cached
    /// entry, then to the offline fallback. 4xx is a real answer and is
    /// relayed as-is (and never cached).
    async fn network_first(&self, req: &WorkerRequest, class: RequestClass) -> WorkerResponse {
        match self.fetcher.get(&req.url).await {
            Ok(resp) if resp.is_cacheable() => {
                self.store_detached(req, &resp);
                WorkerResponse::from_network(&resp)
            }
            Ok(resp) if !resp.status.is_server_error() => WorkerResponse::from_network(&resp),
            Ok(resp) => {
                tracing::debug!(url = %req.url, status = resp.status.as_u16(), "network-first got server error");
                self.cache_or_fallback(req, class).await
            }
            Err(e) => {
                tracing::debug!(url = %req.url, error = %e, "network-first fetch failed");
                self.cache_or_fallback(req, class).await
            }
        }
    }

    /// Cached entry is returned immediately while a detached refresh
    /// replaces it for next time; the caller never waits on the refresh.
    /// A miss awaits the network and stores the result first.
    async fn stale_while_revalidate(&self, req: &WorkerRequest, class: RequestClass) -> WorkerResponse {
        if let Some(entry) = self.cached(req).await {
            self.revalidate_detached(req);
            return WorkerResponse::from_entry(&entry);
        }

        match self.fetcher.get(&req.url).await {
            Ok(resp) => {
                if resp.is_cacheable() {
                    self.store_now(req, &resp).await;
                }
                WorkerResponse::from_network(&resp)
            }
            Err(e) => {
                tracing::debug!(url = %req.url, error = %e, "revalidate miss and network failed");
                self.offline_fallback(req, class).await
            }
        }
    }

    /// Straight network relay; never reads or writes the store.
    async fn network_only(&self, req: &WorkerRequest, class: RequestClass) -> WorkerResponse {
        match self.fetcher.get(&req.url).await {
            Ok(resp) => WorkerResponse::from_network(&resp),
            Err(e) => {
                tracing::debug!(url = %req.url, error = %e, "network-only fetch failed");
                self.offline_fallback(req, class).await
            }
        }
    }

    async fn cached(&self, req: &WorkerRequest) -> Option<CacheEntry> {
        match self.db.match_entry(&self.namespace, &req.identity()).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(url = %req.url, error = %e, "cache read failed");
                None
            }
        }
    }

    /// Persist a 2xx response without delaying the returned response.
    fn store_detached(&self, req: &WorkerRequest, resp: &FetchResponse) {
        let db = self.db.clone();
        let entry = entry_for(&self.namespace, req, resp);
        self.tasks.spawn(async move {
            if let Err(e) = db.put_entry(&entry).await {
                tracing::warn!(url = %entry.url, error = %e, "cache write failed");
            }
        });
    }

    /// Persist a 2xx response before returning (stale-while-revalidate
    /// miss path).
    async fn store_now(&self, req: &WorkerRequest, resp: &FetchResponse) {
        let entry = entry_for(&self.namespace, req, resp);
        if let Err(e) = self.db.put_entry(&entry).await {
            tracing::warn!(url = %entry.url, error = %e, "cache write failed");
        }
    }

    /// Detached refresh of an entry just served stale. Failures are
    /// logged; the stale entry persists until a later refresh overwrites
    /// it or its namespace is collected.
    fn revalidate_detached(&self, req: &WorkerRequest) {
        let db = self.db.clone();
        let namespace = self.namespace.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let req = req.clone();
        self.tasks.spawn(async move {
            match fetcher.get(&req.url).await {
                Ok(resp) if resp.is_cacheable() => {
                    let entry = entry_for(&namespace, &req, &resp);
                    if let Err(e) = db.put_entry(&entry).await {
                        tracing::warn!(url = %req.url, error = %e, "revalidation write failed");
                    }
                }
                Ok(resp) => {
                    tracing::debug!(url = %req.url, status = resp.status.as_u16(), "revalidation not cacheable");
                }
                Err(e) => {
                    tracing::warn!(url = %req.url, error = %e, "revalidation fetch failed");
                }
            }
        });
    }

    async fn cache_or_fallback(&self, req: &WorkerRequest, class: RequestClass) -> WorkerResponse {
        if let Some(entry) = self.cached(req).await {
            return WorkerResponse::from_entry(&entry);
        }
        self.offline_fallback(req, class).await
    }

    /// Total-failure response: the offline document for navigations, a
    /// structured JSON body for data requests, a bare 503 otherwise.
    async fn offline_fallback(&self, req: &WorkerRequest, class: RequestClass) -> WorkerResponse {
        if req.is_navigation() {
            let doc = self
                .db
                .match_entry(&self.namespace, &self.offline_doc_identity)
                .await
                .ok()
                .flatten();
            return WorkerResponse::fallback_document(doc.as_ref());
        }
        match class {
            RequestClass::Data => WorkerResponse::offline_json("no network and no cached response"),
            _ => WorkerResponse::synthesized_503(),
        }
    }
}

/// Build the stored form of a network response.
pub(crate) fn entry_for(namespace: &CacheNamespace, req: &WorkerRequest, resp: &FetchResponse) -> CacheEntry {
    let headers: BTreeMap<String, String> = resp
        .headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
        .collect();

    CacheEntry {
        namespace: namespace.as_str().to_string(),
        identity: req.identity(),
        url: req.url.as_str().to_string(),
        status: resp.status.as_u16(),
        content_type: resp.content_type.clone(),
        headers_json: serde_json::to_string(&headers).ok(),
        body: resp.bytes.to_vec(),
        stored_at: chrono::Utc::now().to_rfc3339(),
    }
}
