//! The pub/sub-backed queue with admission control.

use async_trait::async_trait;
use fedipress_common::AppResult;
use fedipress_core::services::{MessageKind, MessageQueue, QueueMessage};
use fedipress_db::repositories::DeliveryBackoffRepository;
use tracing::{info, warn};

use crate::pubsub::PubSubTopics;
use crate::trace::current_trace_context;

/// Queue implementation publishing to the main pub/sub topic.
///
/// Outbox messages whose target inbox is under an active delivery
/// backoff are dropped before publishing, so broken inboxes are not
/// hammered while their backoff runs down.
#[derive(Clone)]
pub struct PubSubQueue {
    topics: PubSubTopics,
    backoff_repo: DeliveryBackoffRepository,
}

impl PubSubQueue {
    /// Create a new pub/sub queue.
    #[must_use]
    pub const fn new(topics: PubSubTopics, backoff_repo: DeliveryBackoffRepository) -> Self {
        Self {
            topics,
            backoff_repo,
        }
    }
}

#[async_trait]
impl MessageQueue for PubSubQueue {
    async fn enqueue(&self, mut message: QueueMessage) -> AppResult<()> {
        // Admission control.
        if message.kind == MessageKind::Outbox {
            if let Some(inbox) = &message.inbox {
                if let Some(backoff) = self.backoff_repo.get_active(inbox).await? {
                    warn!(
                        inbox = %inbox,
                        failures = backoff.failure_count,
                        backoff_until = %backoff.backoff_until,
                        "Dropping delivery to inbox under backoff"
                    );
                    return Ok(());
                }
            }
        }

        if message.trace_context.is_none() {
            message.trace_context = Some(current_trace_context());
        }

        self.topics.publish(&message).await?;
        info!(
            message_id = %message.id,
            inbox = ?message.inbox,
            "Enqueued delivery"
        );
        Ok(())
    }
}
