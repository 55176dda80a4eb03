//! Deferred sync: named units of work queued while offline and replayed
//! when connectivity returns.
//!
//! A tag is a stable identifier for one kind of deferred work. Tags are
//! deduplicated while queued and consumed by exactly one dispatch attempt;
//! a failed attempt does not requeue the tag, the application registers it
//! again if it still has work to flush.

use std::collections::{BTreeSet, HashMap};
use std::pin::Pin;
use std::sync::Mutex;

use offcache_core::Error;
use serde_json::json;

use crate::clients::ClientRegistry;

type SyncRoutine = Box<dyn Fn() -> Pin<Box<dyn Future<Output = Result<(), Error>> + Send>> + Send + Sync>;

/// Queues sync tags and runs their registered routines.
pub struct SyncCoordinator {
    routines: Mutex<HashMap<String, SyncRoutine>>,
    pending: Mutex<BTreeSet<String>>,
    clients: ClientRegistry,
}

impl SyncCoordinator {
    pub fn new(clients: ClientRegistry) -> Self {
        Self { routines: Mutex::new(HashMap::new()), pending: Mutex::new(BTreeSet::new()), clients }
    }

    /// Install the routine that runs when `tag` is dispatched. A second
    /// registration for the same tag replaces the first.
    pub fn register_routine<F, Fut>(&self, tag: &str, routine: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let boxed: SyncRoutine = Box::new(move || Box::pin(routine()));
        if let Ok(mut routines) = self.routines.lock() {
            routines.insert(tag.to_string(), boxed);
        }
    }

    /// Queue a tag for the next dispatch. Registering an already-queued
    /// tag is a no-op.
    pub fn register(&self, tag: &str) {
        if let Ok(mut pending) = self.pending.lock() {
            if pending.insert(tag.to_string()) {
                tracing::info!(tag, "sync tag queued");
            }
        }
    }

    /// Tags queued and not yet dispatched, in stable order.
    pub fn pending_tags(&self) -> Vec<String> {
        self.pending.lock().map(|p| p.iter().cloned().collect()).unwrap_or_default()
    }

    /// Run the routine for one queued tag. The tag is consumed whether or
    /// not the routine succeeds; clients are notified only on success.
    pub async fn dispatch(&self, tag: &str) -> Result<(), Error> {
        let was_pending = self.pending.lock().map(|mut p| p.remove(tag)).unwrap_or(false);
        if !was_pending {
            tracing::debug!(tag, "sync dispatch for tag that was not queued");
        }

        let fut = match self.routines.lock() {
            Ok(routines) => routines.get(tag).map(|r| r()),
            Err(_) => None,
        };
        let Some(fut) = fut else {
            tracing::warn!(tag, "no sync routine registered");
            return Ok(());
        };

        match fut.await {
            Ok(()) => {
                tracing::info!(tag, "sync complete");
                self.clients.broadcast(json!({ "type": "SYNC_COMPLETE", "tag": tag }));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(tag, error = %e, "sync attempt failed");
                Err(e)
            }
        }
    }

    /// Dispatch every queued tag once, continuing past failures. Returns
    /// the tags whose routines succeeded.
    pub async fn dispatch_pending(&self) -> Vec<String> {
        let mut done = Vec::new();
        for tag in self.pending_tags() {
            if self.dispatch(&tag).await.is_ok() {
                done.push(tag);
            }
        }
        done
    }
}
