//! Worker lifecycle: install, waiting, activation, garbage collection.
//!
//! A version's namespace is populated during install and becomes the only
//! surviving namespace at activation, which is the sole point where old
//! namespaces are deleted. Activation is idempotent; running it twice
//! leaves the same single namespace behind.

use std::sync::Arc;
use std::sync::Mutex;

use offcache_client::Fetcher;
use offcache_core::{CacheDb, CacheNamespace, Error};
use url::Url;

use crate::clients::ClientRegistry;
use crate::request::WorkerRequest;
use crate::strategies::entry_for;

/// Where a worker version is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Not yet installed.
    New,
    /// Precaching the app shell.
    Installing,
    /// Installed, waiting for activation.
    Waiting,
    /// Collecting old namespaces and claiming clients.
    Activating,
    /// Serving requests.
    Active,
    /// Replaced by a newer version; handles no further events.
    Redundant,
}

/// Drives one worker version through install and activation.
pub struct LifecycleManager {
    db: CacheDb,
    namespace: CacheNamespace,
    fetcher: Arc<dyn Fetcher>,
    clients: ClientRegistry,
    origin: Url,
    precache: Vec<String>,
    state: Mutex<WorkerState>,
}

impl LifecycleManager {
    pub fn new(
        db: CacheDb, namespace: CacheNamespace, fetcher: Arc<dyn Fetcher>, clients: ClientRegistry, origin: Url,
        precache: Vec<String>,
    ) -> Self {
        Self { db, namespace, fetcher, clients, origin, precache, state: Mutex::new(WorkerState::New) }
    }

    pub fn state(&self) -> WorkerState {
        self.state.lock().map(|s| *s).unwrap_or(WorkerState::New)
    }

    fn set_state(&self, next: WorkerState) {
        if let Ok(mut state) = self.state.lock() {
            tracing::debug!(from = ?*state, to = ?next, "lifecycle transition");
            *state = next;
        }
    }

    /// Cut the Waiting phase short: activate now instead of waiting for
    /// the previous version's clients to go away. Driven by the control
    /// channel's skip-waiting command.
    pub async fn skip_waiting(&self) -> Result<u64, Error> {
        tracing::info!(namespace = %self.namespace, "skip waiting requested");
        self.activate().await
    }

    /// Precache the app shell into this version's namespace. Individual
    /// fetch failures are logged and skipped so one missing resource does
    /// not block the install; storage failures abort it. Returns the
    /// number of entries precached.
    pub async fn install(&self) -> Result<usize, Error> {
        self.set_state(WorkerState::Installing);
        tracing::info!(namespace = %self.namespace, paths = self.precache.len(), "installing");

        let mut stored = 0;
        for path in &self.precache {
            let url = match self.origin.join(path) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(path, error = %e, "precache path did not resolve");
                    continue;
                }
            };
            let req = WorkerRequest::get(url.clone());
            match self.fetcher.get(&url).await {
                Ok(resp) if resp.is_cacheable() => {
                    self.db.put_entry(&entry_for(&self.namespace, &req, &resp)).await?;
                    stored += 1;
                }
                Ok(resp) => {
                    tracing::warn!(url = %url, status = resp.status.as_u16(), "precache fetch not cacheable");
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "precache fetch failed");
                }
            }
        }

        self.set_state(WorkerState::Waiting);
        tracing::info!(namespace = %self.namespace, stored, "install complete");
        Ok(stored)
    }

    /// Mark this version as replaced. A redundant worker never activates
    /// again.
    pub fn retire(&self) {
        tracing::info!(namespace = %self.namespace, "worker retired");
        self.set_state(WorkerState::Redundant);
    }

    /// Delete every namespace other than this version's and take control
    /// of open clients. This is the only point where namespaces are
    /// collected. Returns the number of namespaces removed.
    pub async fn activate(&self) -> Result<u64, Error> {
        match self.state() {
            WorkerState::Active => {
                tracing::debug!(namespace = %self.namespace, "already active");
                return Ok(0);
            }
            WorkerState::Redundant => {
                tracing::warn!(namespace = %self.namespace, "redundant worker ignoring activate");
                return Ok(0);
            }
            _ => {}
        }
        self.set_state(WorkerState::Activating);

        let mut removed = 0;
        for name in self.db.list_namespaces().await? {
            if name != self.namespace.as_str() {
                let entries = self.db.delete_namespace(&CacheNamespace::from_name(&name)).await?;
                tracing::info!(namespace = %name, entries, "collected stale namespace");
                removed += 1;
            }
        }

        self.clients.claim(self.namespace.as_str());
        self.set_state(WorkerState::Active);
        tracing::info!(namespace = %self.namespace, removed, "activation complete");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeFetcher;
    use offcache_core::CacheEntry;
    use offcache_core::cache::identity::request_identity;

    fn origin() -> Url {
        Url::parse("https://app.example.com").unwrap()
    }

    fn manager(db: &CacheDb, fake: &Arc<FakeFetcher>, version: &str, precache: Vec<&str>) -> LifecycleManager {
        LifecycleManager::new(
            db.clone(),
            CacheNamespace::new("app", version),
            Arc::clone(fake) as Arc<dyn Fetcher>,
            ClientRegistry::new(),
            origin(),
            precache.into_iter().map(str::to_string).collect(),
        )
    }

    async fn seed(db: &CacheDb, namespace: &str, url: &str) {
        let entry = CacheEntry {
            namespace: namespace.to_string(),
            identity: request_identity("GET", url),
            url: url.to_string(),
            status: 200,
            content_type: None,
            headers_json: None,
            body: b"x".to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        };
        db.put_entry(&entry).await.unwrap();
    }

    #[tokio::test]
    async fn test_install_precaches_app_shell() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fake = Arc::new(FakeFetcher::new());
        fake.push_ok(200, "<html>index</html>");
        fake.push_ok(200, "<html>offline</html>");

        let mgr = manager(&db, &fake, "v1", vec!["/index.html", "/offline.html"]);
        let stored = mgr.install().await.unwrap();

        assert_eq!(stored, 2);
        assert_eq!(mgr.state(), WorkerState::Waiting);
        let ns = CacheNamespace::new("app", "v1");
        let entry = db
            .match_entry(&ns, &request_identity("GET", "https://app.example.com/index.html"))
            .await
            .unwrap();
        assert!(entry.is_some());
    }

    #[tokio::test]
    async fn test_install_rerun_leaves_contents_unchanged() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fake = Arc::new(FakeFetcher::new());
        fake.push_ok(200, "<html>index</html>");
        fake.push_ok(200, "<html>offline</html>");
        fake.push_ok(200, "<html>index</html>");
        fake.push_ok(200, "<html>offline</html>");

        let mgr = manager(&db, &fake, "v1", vec!["/index.html", "/offline.html"]);
        mgr.install().await.unwrap();
        let ns = CacheNamespace::new("app", "v1");
        let before = db.namespace_stats(&ns).await.unwrap();

        mgr.install().await.unwrap();
        let after = db.namespace_stats(&ns).await.unwrap();

        assert_eq!(after.count, before.count);
        assert_eq!(after.keys, before.keys);
        assert_eq!(db.list_namespaces().await.unwrap(), vec!["app-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_install_skips_failed_fetches() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fake = Arc::new(FakeFetcher::new());
        fake.push_ok(200, "<html>index</html>");
        fake.push_err(Error::Network("resolve failed".to_string()));
        fake.push_ok(404, "missing");

        let mgr = manager(&db, &fake, "v1", vec!["/index.html", "/a.html", "/b.html"]);
        let stored = mgr.install().await.unwrap();

        assert_eq!(stored, 1);
        assert_eq!(mgr.state(), WorkerState::Waiting);
    }

    #[tokio::test]
    async fn test_activate_collects_other_namespaces() {
        let db = CacheDb::open_in_memory().await.unwrap();
        seed(&db, "app-v1", "https://app.example.com/old").await;
        seed(&db, "app-v2", "https://app.example.com/new").await;

        let fake = Arc::new(FakeFetcher::new());
        let mgr = manager(&db, &fake, "v2", vec![]);
        let removed = mgr.activate().await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(mgr.state(), WorkerState::Active);
        assert_eq!(db.list_namespaces().await.unwrap(), vec!["app-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_activate_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        seed(&db, "app-v1", "https://app.example.com/old").await;
        seed(&db, "app-v2", "https://app.example.com/new").await;

        let fake = Arc::new(FakeFetcher::new());
        let mgr = manager(&db, &fake, "v2", vec![]);
        assert_eq!(mgr.activate().await.unwrap(), 1);
        assert_eq!(mgr.activate().await.unwrap(), 0);

        assert_eq!(mgr.state(), WorkerState::Active);
        assert_eq!(db.list_namespaces().await.unwrap(), vec!["app-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_activate_claims_clients() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fake = Arc::new(FakeFetcher::new());
        let clients = ClientRegistry::new();
        let (_, mut rx) = clients.connect();

        let mgr = LifecycleManager::new(
            db,
            CacheNamespace::new("app", "v3"),
            Arc::clone(&fake) as Arc<dyn Fetcher>,
            clients,
            origin(),
            vec![],
        );
        mgr.activate().await.unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg["type"], "CONTROLLER_CHANGED");
        assert_eq!(msg["version"], "app-v3");
    }

    #[tokio::test]
    async fn test_retired_worker_never_activates() {
        let db = CacheDb::open_in_memory().await.unwrap();
        seed(&db, "app-v1", "https://app.example.com/old").await;

        let fake = Arc::new(FakeFetcher::new());
        let mgr = manager(&db, &fake, "v2", vec![]);
        mgr.retire();

        assert_eq!(mgr.activate().await.unwrap(), 0);
        assert_eq!(mgr.state(), WorkerState::Redundant);
        // The old namespace survives because no collection ran.
        assert_eq!(db.list_namespaces().await.unwrap(), vec!["app-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_skip_waiting_activates_from_waiting() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fake = Arc::new(FakeFetcher::new());
        let mgr = manager(&db, &fake, "v1", vec![]);

        mgr.install().await.unwrap();
        assert_eq!(mgr.state(), WorkerState::Waiting);

        mgr.skip_waiting().await.unwrap();
        assert_eq!(mgr.state(), WorkerState::Active);
    }
}
