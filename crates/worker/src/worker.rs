//! The worker facade: one event handler per event source.
//!
//! Each `handle_*` method runs to completion before the caller feeds the
//! next event, which keeps event handling single-owner; only work spawned
//! onto the task queue runs concurrently with it.

use std::sync::Arc;

use offcache_client::Fetcher;
use offcache_core::cache::entries::NamespaceStats;
use offcache_core::{AppConfig, CacheDb, CacheNamespace, Error};
use url::Url;

use crate::clients::ClientRegistry;
use crate::control::{ControlMessage, ControlReply, MessageEvent};
use crate::lifecycle::{LifecycleManager, WorkerState};
use crate::push::{NotificationAction, NotificationSink, PushAdapter};
use crate::request::WorkerRequest;
use crate::response::WorkerResponse;
use crate::router::{RouteDecision, Router, Strategy};
use crate::strategies::StrategyExecutor;
use crate::sync::SyncCoordinator;
use crate::tasks::TaskQueue;

/// What the worker did with one fetch event.
#[derive(Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The worker produced this response.
    Handled(WorkerResponse),
    /// Out of scope; the caller goes straight to the network.
    Bypass,
}

/// One worker version bound to its namespace, store, and fetch client.
pub struct Worker {
    namespace: CacheNamespace,
    db: CacheDb,
    router: Router,
    executor: StrategyExecutor,
    lifecycle: LifecycleManager,
    sync: SyncCoordinator,
    push: PushAdapter,
    clients: ClientRegistry,
    tasks: Arc<TaskQueue>,
}

impl Worker {
    /// Open the store at the configured path and assemble the worker.
    pub async fn new(
        config: &AppConfig, fetcher: Arc<dyn Fetcher>, sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, Error> {
        let db = CacheDb::open(&config.db_path).await?;
        Self::with_db(config, db, fetcher, sink)
    }

    /// Assemble the worker over an already-open store.
    pub fn with_db(
        config: &AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>, sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, Error> {
        let origin =
            Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin '{}': {e}", config.origin)))?;
        let offline_doc = origin
            .join(&config.offline_document)
            .map_err(|e| Error::InvalidUrl(format!("offline document '{}': {e}", config.offline_document)))?;

        let namespace = config.namespace();
        let clients = ClientRegistry::new();
        let tasks = Arc::new(TaskQueue::new());
        let router = Router::from_config(config)?;
        let executor = StrategyExecutor::new(
            db.clone(),
            namespace.clone(),
            Arc::clone(&fetcher),
            Arc::clone(&tasks),
            &offline_doc,
        );
        let lifecycle = LifecycleManager::new(
            db.clone(),
            namespace.clone(),
            fetcher,
            clients.clone(),
            origin.clone(),
            config.precache.clone(),
        );
        let sync = SyncCoordinator::new(clients.clone());
        let push = PushAdapter::new(sink, clients.clone(), origin);

        Ok(Self { namespace, db, router, executor, lifecycle, sync, push, clients, tasks })
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    /// Mark this worker as replaced by a newer version.
    pub fn retire(&self) {
        self.lifecycle.retire();
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Deferred-sync registration surface for the embedding application.
    pub fn sync(&self) -> &SyncCoordinator {
        &self.sync
    }

    /// Add a custom route evaluated before the built-in rules.
    pub fn add_route(&mut self, pattern: &str, strategy: Strategy) -> Result<(), Error> {
        self.router.push_rule(pattern, strategy)
    }

    /// Install event: precache the app shell into this version's
    /// namespace. Returns the number of entries stored.
    pub async fn handle_install(&self) -> Result<usize, Error> {
        self.lifecycle.install().await
    }

    /// Activate event: collect old namespaces and claim open clients.
    /// Returns the number of namespaces removed.
    pub async fn handle_activate(&self) -> Result<u64, Error> {
        self.lifecycle.activate().await
    }

    /// Fetch event: route the request and run its strategy.
    pub async fn handle_fetch(&self, req: &WorkerRequest) -> FetchOutcome {
        match self.router.route(req) {
            RouteDecision::Bypass => FetchOutcome::Bypass,
            RouteDecision::Handle { strategy, class } => {
                let resp = self.executor.execute(strategy, class, req).await;
                tracing::debug!(url = %req.url, ?strategy, status = resp.status, source = ?resp.source, "fetch handled");
                FetchOutcome::Handled(resp)
            }
        }
    }

    /// Sync event: run the routine registered for one queued tag.
    pub async fn handle_sync(&self, tag: &str) -> Result<(), Error> {
        self.sync.dispatch(tag).await
    }

    /// Message event: execute one control command and send exactly one
    /// reply on the event's port, if it has one.
    pub async fn handle_message(&self, event: MessageEvent) {
        let MessageEvent { message, reply } = event;

        let outcome = match ControlMessage::parse(&message) {
            Ok(ControlMessage::SkipWaiting) => match self.lifecycle.skip_waiting().await {
                Ok(_) => ControlReply::Ack,
                Err(e) => ControlReply::Failure { error: e.to_string() },
            },
            Ok(ControlMessage::GetCacheStats) => match self.db.namespace_stats(&self.namespace).await {
                Ok(stats) => {
                    ControlReply::CacheStats { namespace: stats.namespace, count: stats.count, keys: stats.keys }
                }
                Err(e) => ControlReply::Failure { error: e.to_string() },
            },
            Ok(ControlMessage::ClearCache) => match self.db.delete_namespace(&self.namespace).await {
                Ok(removed) => {
                    tracing::info!(namespace = %self.namespace, removed, "cache cleared by client");
                    ControlReply::CacheCleared { ok: true }
                }
                Err(e) => {
                    tracing::warn!(namespace = %self.namespace, error = %e, "cache clear failed");
                    ControlReply::CacheCleared { ok: false }
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unrecognized control message");
                ControlReply::Failure { error: e.to_string() }
            }
        };

        if let Some(port) = reply
            && port.send(outcome).is_err()
        {
            tracing::debug!("control reply port closed before reply");
        }
    }

    /// Push event: parse and display one payload.
    pub fn handle_push(&self, payload: &[u8]) -> bool {
        self.push.handle_push(payload)
    }

    /// Notification click event.
    pub fn handle_notification_click(&self, action: NotificationAction, url: &Url) {
        self.push.handle_click(action, url);
    }

    /// Stats for the active namespace.
    pub async fn cache_stats(&self) -> Result<NamespaceStats, Error> {
        self.db.namespace_stats(&self.namespace).await
    }

    /// Wait for all detached work spawned so far.
    pub async fn drain_tasks(&self) {
        self.tasks.drain().await;
    }
}
