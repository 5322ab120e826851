//! In-process queue variant.
//!
//! Same admission control and push-envelope semantics as the pub/sub
//! queue, carried over a tokio channel. Used by tests and single-node
//! deployments without Redis.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use fedipress_common::{AppError, AppResult};
use fedipress_core::services::{MessageKind, MessageQueue, QueueMessage};
use fedipress_db::repositories::DeliveryBackoffRepository;
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::push::{PushMessageHandler, PushStatus};
use crate::trace::current_trace_context;

/// In-process delivery queue.
#[derive(Clone)]
pub struct InProcessQueue {
    sender: mpsc::UnboundedSender<String>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    backoff_repo: DeliveryBackoffRepository,
}

impl InProcessQueue {
    /// Create a new in-process queue.
    #[must_use]
    pub fn new(backoff_repo: DeliveryBackoffRepository) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            backoff_repo,
        }
    }

    /// Consume envelopes with the push handler until cancelled.
    pub async fn listen(
        &self,
        handler: Arc<PushMessageHandler>,
        cancel: CancellationToken,
    ) -> AppResult<()> {
        handler.set_listening(true);
        info!("In-process queue listener started");

        let mut receiver = self.receiver.lock().await;
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    handler.set_listening(false);
                    info!("In-process queue listener cancelled");
                    return Ok(());
                }
                envelope = receiver.recv() => {
                    let Some(envelope) = envelope else { return Ok(()) };
                    let status = handler.handle_push(envelope.as_bytes()).await;
                    if status != PushStatus::Ok {
                        warn!(status = status.code(), "In-process envelope not consumed");
                    }
                }
            }
        }
    }
}

#[async_trait]
impl MessageQueue for InProcessQueue {
    async fn enqueue(&self, mut message: QueueMessage) -> AppResult<()> {
        if message.kind == MessageKind::Outbox {
            if let Some(inbox) = &message.inbox {
                if let Some(backoff) = self.backoff_repo.get_active(inbox).await? {
                    warn!(
                        inbox = %inbox,
                        failures = backoff.failure_count,
                        "Dropping delivery to inbox under backoff"
                    );
                    return Ok(());
                }
            }
        }

        if message.trace_context.is_none() {
            message.trace_context = Some(current_trace_context());
        }

        let data = serde_json::to_vec(&message)
            .map_err(|e| AppError::Queue(format!("encode message: {e}")))?;
        let envelope = json!({
            "message": {
                "message_id": message.id,
                "data": BASE64.encode(data),
                "attributes": { "fedifyId": message.id },
            }
        });
        self.sender
            .send(envelope.to_string())
            .map_err(|_| AppError::Queue("queue closed".to_string()))
    }
}
