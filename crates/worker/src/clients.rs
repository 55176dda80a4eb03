//! Host pages connected to the worker.
//!
//! Clients receive broadcast messages (sync completion, controller
//! changes) as JSON values over unbounded channels. Senders whose
//! receiver is gone are pruned on the next broadcast.

use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct Inner {
    senders: Mutex<HashMap<u64, mpsc::UnboundedSender<Value>>>,
    next_id: AtomicU64,
}

/// Registry of open client pages.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    inner: Arc<Inner>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a client; returns its id and the message receiver.
    pub fn connect(&self) -> (u64, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut senders) = self.inner.senders.lock() {
            senders.insert(id, tx);
        }
        (id, rx)
    }

    /// Detach a client.
    pub fn disconnect(&self, id: u64) {
        if let Ok(mut senders) = self.inner.senders.lock() {
            senders.remove(&id);
        }
    }

    /// Number of attached clients.
    pub fn len(&self) -> usize {
        self.inner.senders.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Send a message to every open client, dropping dead channels.
    pub fn broadcast(&self, message: Value) {
        if let Ok(mut senders) = self.inner.senders.lock() {
            senders.retain(|id, tx| {
                let alive = tx.send(message.clone()).is_ok();
                if !alive {
                    tracing::debug!(client = id, "dropping disconnected client");
                }
                alive
            });
        }
    }

    /// Take control of all open clients after activation.
    pub fn claim(&self, version: &str) {
        tracing::info!(version, clients = self.len(), "claiming open clients");
        self.broadcast(json!({ "type": "CONTROLLER_CHANGED", "version": version }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_all_clients() {
        let registry = ClientRegistry::new();
        let (_, mut rx1) = registry.connect();
        let (_, mut rx2) = registry.connect();

        registry.broadcast(json!({ "type": "PING" }));

        assert_eq!(rx1.recv().await.unwrap()["type"], "PING");
        assert_eq!(rx2.recv().await.unwrap()["type"], "PING");
    }

    #[tokio::test]
    async fn test_disconnected_clients_pruned() {
        let registry = ClientRegistry::new();
        let (id, rx) = registry.connect();
        let (_, mut rx2) = registry.connect();
        drop(rx);
        registry.disconnect(id);

        registry.broadcast(json!({ "type": "PING" }));
        assert_eq!(registry.len(), 1);
        assert!(rx2.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_claim_broadcasts_controller_change() {
        let registry = ClientRegistry::new();
        let (_, mut rx) = registry.connect();

        registry.claim("app-v2");

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg["type"], "CONTROLLER_CHANGED");
        assert_eq!(msg["version"], "app-v2");
    }
}
