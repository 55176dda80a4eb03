//! Control channel between client pages and the worker.
//!
//! Clients post small JSON messages; a message that expects an answer
//! carries a oneshot reply port, and the worker sends exactly one reply
//! on it per message. Unrecognized messages never crash the worker.

use offcache_core::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

/// Commands a client page can post to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Activate the waiting version immediately.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
    /// Report entry count and cached URLs for the active namespace.
    #[serde(rename = "GET_CACHE_STATS")]
    GetCacheStats,
    /// Delete every entry in the active namespace.
    #[serde(rename = "CLEAR_CACHE")]
    ClearCache,
}

impl ControlMessage {
    /// Parse a raw client message. Anything without a recognized `type`
    /// field is rejected.
    pub fn parse(raw: &Value) -> Result<Self, Error> {
        serde_json::from_value(raw.clone())
            .map_err(|e| Error::InvalidMessage(format!("unrecognized control message: {e}")))
    }
}

/// The single reply sent back for a control message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlReply {
    /// The command was accepted; no data to return.
    #[serde(rename = "ACK")]
    Ack,
    #[serde(rename = "CACHE_STATS")]
    CacheStats { namespace: String, count: u64, keys: Vec<String> },
    #[serde(rename = "CACHE_CLEARED")]
    CacheCleared { ok: bool },
    #[serde(rename = "ERROR")]
    Failure { error: String },
}

/// One posted message plus its optional reply port.
#[derive(Debug)]
pub struct MessageEvent {
    pub message: Value,
    pub reply: Option<oneshot::Sender<ControlReply>>,
}

impl MessageEvent {
    /// Build an event that expects a reply; the caller keeps the receiver.
    pub fn with_reply(message: Value) -> (Self, oneshot::Receiver<ControlReply>) {
        let (tx, rx) = oneshot::channel();
        (Self { message, reply: Some(tx) }, rx)
    }

    /// Build a fire-and-forget event.
    pub fn post(message: Value) -> Self {
        Self { message, reply: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_messages() {
        assert_eq!(ControlMessage::parse(&json!({ "type": "SKIP_WAITING" })).unwrap(), ControlMessage::SkipWaiting);
        assert_eq!(
            ControlMessage::parse(&json!({ "type": "GET_CACHE_STATS" })).unwrap(),
            ControlMessage::GetCacheStats
        );
        assert_eq!(ControlMessage::parse(&json!({ "type": "CLEAR_CACHE" })).unwrap(), ControlMessage::ClearCache);
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        assert!(ControlMessage::parse(&json!({ "type": "SELF_DESTRUCT" })).is_err());
        assert!(ControlMessage::parse(&json!({ "hello": "world" })).is_err());
        assert!(ControlMessage::parse(&json!("SKIP_WAITING")).is_err());
    }

    #[test]
    fn test_reply_wire_shape() {
        let reply = ControlReply::CacheStats {
            namespace: "app-v1".to_string(),
            count: 2,
            keys: vec!["https://a".to_string(), "https://b".to_string()],
        };
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value["type"], "CACHE_STATS");
        assert_eq!(value["count"], 2);
        assert_eq!(value["keys"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reply_port_round_trip() {
        let (event, rx) = MessageEvent::with_reply(json!({ "type": "SKIP_WAITING" }));
        event.reply.unwrap().send(ControlReply::Ack).unwrap();
        assert_eq!(rx.await.unwrap(), ControlReply::Ack);
    }
}
