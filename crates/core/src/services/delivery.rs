//! Outbound delivery seam.
//!
//! Core services enqueue federated deliveries through this trait
//! without depending on the queue implementation; the queue crate
//! provides the pub/sub-backed variant with admission control.

use async_trait::async_trait;
use fedipress_common::AppResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Which pipeline a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Inbound activity processing.
    Inbox,
    /// Outbound delivery to a remote inbox.
    Outbox,
}

/// Tracing context injected into queued payloads (W3C + Sentry).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    /// W3C `traceparent` header value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceparent: Option<String>,
    /// W3C `tracestate` header value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracestate: Option<String>,
    /// `sentry-trace` header value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentry_trace: Option<String>,
}

impl TraceContext {
    /// Whether any field is populated.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.traceparent.is_none() && self.tracestate.is_none() && self.sentry_trace.is_none()
    }
}

/// A queued message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    /// Message id, carried end to end in the transport attributes.
    pub id: String,
    /// Pipeline this message belongs to.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Target inbox URL (outbox messages).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inbox: Option<String>,
    /// The activity (or envelope) being carried.
    pub payload: Value,
    /// Propagated tracing context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_context: Option<TraceContext>,
}

impl QueueMessage {
    /// Build an outbox message targeting a remote inbox.
    #[must_use]
    pub fn outbox(id: String, inbox: String, payload: Value) -> Self {
        Self {
            id,
            kind: MessageKind::Outbox,
            inbox: Some(inbox),
            payload,
            trace_context: None,
        }
    }

    /// Build an inbox-pipeline message.
    #[must_use]
    pub fn inbox_pipeline(id: String, payload: Value) -> Self {
        Self {
            id,
            kind: MessageKind::Inbox,
            inbox: None,
            payload,
            trace_context: None,
        }
    }
}

/// Trait for enqueueing outbound messages.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueue a message for asynchronous delivery.
    ///
    /// Implementations drop outbox messages whose target inbox is
    /// under an active delivery backoff.
    async fn enqueue(&self, message: QueueMessage) -> AppResult<()>;
}

/// A no-op queue for tests or disabled federation.
#[derive(Clone, Default)]
pub struct NoOpQueue;

#[async_trait]
impl MessageQueue for NoOpQueue {
    async fn enqueue(&self, _message: QueueMessage) -> AppResult<()> {
        Ok(())
    }
}

/// A queue that records enqueued messages (test helper).
#[derive(Clone, Default)]
pub struct RecordingQueue {
    messages: Arc<Mutex<Vec<QueueMessage>>>,
}

impl RecordingQueue {
    /// Create an empty recording queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages enqueued so far.
    pub async fn messages(&self) -> Vec<QueueMessage> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl MessageQueue for RecordingQueue {
    async fn enqueue(&self, message: QueueMessage) -> AppResult<()> {
        self.messages.lock().await.push(message);
        Ok(())
    }
}

/// Shared handle to the configured queue.
pub type QueueService = Arc<dyn MessageQueue>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_serialization_shape() {
        let message = QueueMessage::outbox(
            "m1".to_string(),
            "https://remote.example/inbox".to_string(),
            json!({"type": "Follow"}),
        );
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["type"], "outbox");
        assert_eq!(value["inbox"], "https://remote.example/inbox");
        assert_eq!(value["payload"]["type"], "Follow");
        assert!(value.get("trace_context").is_none());
    }

    #[test]
    fn test_message_round_trip_with_trace() {
        let mut message = QueueMessage::inbox_pipeline("m2".to_string(), json!({}));
        message.trace_context = Some(TraceContext {
            traceparent: Some("00-abc-def-01".to_string()),
            tracestate: None,
            sentry_trace: Some("abc-def".to_string()),
        });

        let encoded = serde_json::to_string(&message).unwrap();
        let decoded: QueueMessage = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.kind, MessageKind::Inbox);
        assert_eq!(
            decoded.trace_context.unwrap().traceparent.as_deref(),
            Some("00-abc-def-01")
        );
    }
}
