//! Push transport handler.
//!
//! The transport POSTs envelopes of the shape
//! `{message: {message_id, data: <base64 JSON>, attributes}}`. The
//! status code returned here steers the transport: `200` consumes the
//! message (including handled failures), `400` rejects a malformed
//! envelope, `429` signals that no listener is attached yet, and
//! `500` asks the transport to retry when no retry topic exists.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use fedipress_common::AppResult;
use fedipress_core::services::{MessageKind, QueueMessage};
use fedipress_db::repositories::DeliveryBackoffRepository;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::classify::{classify_delivery_error, Classification, DeliveryError};
use crate::MESSAGE_ID_ATTRIBUTE;

/// Push transport envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelope {
    pub message: PushEnvelopeMessage,
}

/// The message element of a push envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelopeMessage {
    pub message_id: String,
    /// Base64-encoded JSON of the queued message.
    pub data: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// Handler invoked with each decoded queue message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process one message. Errors are classified for retry routing.
    async fn handle(&self, message: QueueMessage) -> Result<(), DeliveryError>;
}

/// Republishes a consumed envelope onto the retry topic.
#[async_trait]
pub trait RetryPublisher: Send + Sync {
    /// Republish the same payload and attributes.
    async fn republish(&self, data: &str, attributes: &HashMap<String, String>) -> AppResult<()>;
}

/// Callback invoked exactly once for every caught handler error.
pub type ErrorListener = Arc<dyn Fn(&DeliveryError) + Send + Sync>;

fn default_error_listener() -> ErrorListener {
    Arc::new(|error: &DeliveryError| {
        error!(error = %error, "Delivery handler error");
        sentry::capture_message(&error.to_string(), sentry::Level::Error);
    })
}

/// Outcome of handling one push envelope, as a transport status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStatus {
    Ok,
    BadRequest,
    NotListening,
    RetryLater,
}

impl PushStatus {
    /// The HTTP status the transport receives.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::NotListening => 429,
            Self::RetryLater => 500,
        }
    }
}

/// The push-side half of the queue: envelope parsing, handler
/// invocation, retry routing and backoff accounting.
#[derive(Clone)]
pub struct PushMessageHandler {
    handler: Arc<dyn MessageHandler>,
    backoff_repo: DeliveryBackoffRepository,
    retry: Option<Arc<dyn RetryPublisher>>,
    error_listener: ErrorListener,
    listening: Arc<AtomicBool>,
}

impl PushMessageHandler {
    /// Create a new push handler. It rejects messages with `429`
    /// until [`Self::set_listening`] is called.
    #[must_use]
    pub fn new(
        handler: Arc<dyn MessageHandler>,
        backoff_repo: DeliveryBackoffRepository,
        retry: Option<Arc<dyn RetryPublisher>>,
    ) -> Self {
        Self {
            handler,
            backoff_repo,
            retry,
            error_listener: default_error_listener(),
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the error listener (telemetry hook).
    #[must_use]
    pub fn with_error_listener(mut self, listener: ErrorListener) -> Self {
        self.error_listener = listener;
        self
    }

    /// Flip the listening gate.
    pub fn set_listening(&self, listening: bool) {
        self.listening.store(listening, Ordering::SeqCst);
    }

    /// Whether the handler currently accepts messages.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Handle one raw push envelope body.
    pub async fn handle_push(&self, body: &[u8]) -> PushStatus {
        if !self.is_listening() {
            return PushStatus::NotListening;
        }

        let Ok(envelope) = serde_json::from_slice::<PushEnvelope>(body) else {
            warn!("Malformed push envelope");
            return PushStatus::BadRequest;
        };
        let Ok(decoded) = BASE64.decode(&envelope.message.data) else {
            warn!(message_id = %envelope.message.message_id, "Envelope data is not base64");
            return PushStatus::BadRequest;
        };
        let Ok(mut message) = serde_json::from_slice::<QueueMessage>(&decoded) else {
            warn!(message_id = %envelope.message.message_id, "Envelope data is not a queue message");
            return PushStatus::BadRequest;
        };

        // The id attribute survives retry-topic hops; prefer it.
        if let Some(id) = envelope.message.attributes.get(MESSAGE_ID_ATTRIBUTE) {
            message.id.clone_from(id);
        }

        let inbox = matches!(message.kind, MessageKind::Outbox)
            .then(|| message.inbox.clone())
            .flatten();

        match self.handler.handle(message).await {
            Ok(()) => {
                // Successful delivery clears any recorded failure.
                if let Some(inbox) = inbox {
                    if let Err(e) = self.backoff_repo.clear(&inbox).await {
                        warn!(inbox = %inbox, error = %e, "Failed to clear delivery backoff");
                    }
                }
                PushStatus::Ok
            }
            Err(delivery_error) => {
                (self.error_listener)(&delivery_error);
                self.handle_failure(&envelope, inbox.as_deref(), &delivery_error)
                    .await
            }
        }
    }

    async fn handle_failure(
        &self,
        envelope: &PushEnvelope,
        inbox: Option<&str>,
        error: &DeliveryError,
    ) -> PushStatus {
        match classify_delivery_error(error) {
            Classification::Retryable => {
                if let Some(retry) = &self.retry {
                    debug!(
                        message_id = %envelope.message.message_id,
                        error = %error,
                        "Republishing to retry topic"
                    );
                    if let Err(e) = retry
                        .republish(&envelope.message.data, &envelope.message.attributes)
                        .await
                    {
                        error!(error = %e, "Retry republish failed");
                        return PushStatus::RetryLater;
                    }
                    // Consumed here; the retry topic owns it now.
                    PushStatus::Ok
                } else {
                    // No retry topic: let the transport retry at its
                    // own cadence.
                    PushStatus::RetryLater
                }
            }
            Classification::Permanent => {
                if let Some(inbox) = inbox {
                    match self.backoff_repo.record_failure(inbox, &error.to_string()).await {
                        Ok(record) => info!(
                            inbox = %inbox,
                            failures = record.failure_count,
                            backoff_until = %record.backoff_until,
                            "Recorded permanent delivery failure"
                        ),
                        Err(e) => {
                            warn!(inbox = %inbox, error = %e, "Failed to record delivery failure");
                        }
                    }
                }
                PushStatus::Ok
            }
        }
    }
}
