//! Push payload parsing and notification display.
//!
//! Push payloads arrive as opaque bytes; anything that is not the
//! expected JSON shape is logged and dropped, never surfaced to the user.
//! Display itself goes through [`NotificationSink`] so the runtime host
//! decides how notifications are rendered.

use std::sync::Arc;

use offcache_core::Error;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::clients::ClientRegistry;

/// Expected JSON shape of a push payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub data: PushData,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PushData {
    #[serde(default)]
    pub url: Option<String>,
}

impl PushPayload {
    /// Parse raw push bytes. Anything that is not the expected shape,
    /// including a blank title, is rejected.
    pub fn parse(payload: &[u8]) -> Result<Self, Error> {
        let parsed: Self =
            serde_json::from_slice(payload).map_err(|e| Error::InvalidPayload(format!("push payload: {e}")))?;
        if parsed.title.trim().is_empty() {
            return Err(Error::InvalidPayload("push payload has an empty title".to_string()));
        }
        Ok(parsed)
    }
}

/// Buttons offered on a displayed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationAction {
    View,
    Dismiss,
}

/// A notification ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Absolute URL opened when the notification is viewed.
    pub url: Url,
    pub actions: Vec<NotificationAction>,
}

/// Where notifications are rendered.
pub trait NotificationSink: Send + Sync {
    fn show(&self, notification: &Notification);
}

/// Sink that only logs, for headless runs.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn show(&self, notification: &Notification) {
        tracing::info!(title = %notification.title, url = %notification.url, "notification shown");
    }
}

/// Turns raw push payloads into displayed notifications and routes
/// notification clicks back to client pages.
pub struct PushAdapter {
    sink: Arc<dyn NotificationSink>,
    clients: ClientRegistry,
    default_url: Url,
}

impl PushAdapter {
    /// `default_url` anchors relative payload URLs and is opened when a
    /// payload carries no URL of its own.
    pub fn new(sink: Arc<dyn NotificationSink>, clients: ClientRegistry, default_url: Url) -> Self {
        Self { sink, clients, default_url }
    }

    /// Parse and display one push payload. Returns whether a notification
    /// was shown; malformed payloads are dropped.
    pub fn handle_push(&self, payload: &[u8]) -> bool {
        let parsed = match PushPayload::parse(payload) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, bytes = payload.len(), "dropping malformed push payload");
                return false;
            }
        };

        let url = match parsed.data.url.as_deref() {
            Some(raw) => match self.default_url.join(raw) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(raw, error = %e, "push payload url did not resolve, using default");
                    self.default_url.clone()
                }
            },
            None => self.default_url.clone(),
        };

        let notification = Notification {
            title: parsed.title,
            body: parsed.body,
            url,
            actions: vec![NotificationAction::View, NotificationAction::Dismiss],
        };
        self.sink.show(&notification);
        true
    }

    /// React to a click on a displayed notification.
    pub fn handle_click(&self, action: NotificationAction, url: &Url) {
        match action {
            NotificationAction::View => {
                tracing::info!(url = %url, "notification viewed");
                self.clients.broadcast(json!({ "type": "OPEN_WINDOW", "url": url.as_str() }));
            }
            NotificationAction::Dismiss => {
                tracing::debug!(url = %url, "notification dismissed");
            }
        }
    }
}
