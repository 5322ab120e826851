//! Redis-backed pub/sub topics for the delivery queue.
//!
//! The main topic carries freshly enqueued messages; the retry topic
//! replays retryable failures. Envelopes are the push-transport shape,
//! so both local subscribers and an external push transport can feed
//! the same handler.

use std::collections::HashMap;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use fedipress_common::{AppError, AppResult};
use fedipress_core::services::QueueMessage;
use fred::clients::{Client, SubscriberClient};
use fred::interfaces::{ClientLike, EventInterface, PubsubInterface};
use fred::types::config::Config as RedisConfig;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::push::{PushMessageHandler, PushStatus, RetryPublisher};
use crate::MESSAGE_ID_ATTRIBUTE;

/// Pub/sub topics for the delivery pipeline.
#[derive(Clone)]
pub struct PubSubTopics {
    publisher: Client,
    subscriber: SubscriberClient,
    main_topic: String,
    retry_topic: Option<String>,
}

impl PubSubTopics {
    /// Connect publisher and subscriber clients.
    pub async fn connect(
        redis_url: &str,
        prefix: &str,
        retry_topic: Option<String>,
    ) -> AppResult<Self> {
        let config = RedisConfig::from_url(redis_url)
            .map_err(|e| AppError::Redis(format!("bad redis url: {e}")))?;

        let publisher = Client::new(config.clone(), None, None, None);
        publisher
            .init()
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;

        let subscriber = SubscriberClient::new(config, None, None, None);
        subscriber
            .init()
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;

        info!(prefix = %prefix, "Queue pub/sub initialized");
        Ok(Self {
            publisher,
            subscriber,
            main_topic: format!("{prefix}:deliver"),
            retry_topic: retry_topic.map(|t| format!("{prefix}:{t}")),
        })
    }

    /// The retry topic channel, when configured.
    #[must_use]
    pub fn retry_topic(&self) -> Option<&str> {
        self.retry_topic.as_deref()
    }

    /// Publish a queue message to the main topic, wrapped in a push
    /// envelope carrying the message id attribute.
    pub async fn publish(&self, message: &QueueMessage) -> AppResult<()> {
        let data = serde_json::to_vec(message)
            .map_err(|e| AppError::Queue(format!("encode message: {e}")))?;
        let envelope = json!({
            "message": {
                "message_id": message.id,
                "data": BASE64.encode(data),
                "attributes": { "fedifyId": message.id },
            }
        });
        self.publish_raw(&self.main_topic, &envelope.to_string())
            .await
    }

    async fn publish_raw(&self, channel: &str, payload: &str) -> AppResult<()> {
        let _: () = self
            .publisher
            .publish(channel, payload)
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;
        debug!(channel = %channel, "Published queue envelope");
        Ok(())
    }

    /// Subscribe to both topics and pump envelopes into the handler
    /// until cancelled. In-flight envelopes finish after cancellation.
    pub async fn listen(
        &self,
        handler: Arc<PushMessageHandler>,
        cancel: CancellationToken,
    ) -> AppResult<()> {
        self.subscriber
            .subscribe(self.main_topic.as_str())
            .await
            .map_err(|e| AppError::Redis(e.to_string()))?;
        if let Some(retry) = &self.retry_topic {
            self.subscriber
                .subscribe(retry.as_str())
                .await
                .map_err(|e| AppError::Redis(e.to_string()))?;
        }

        handler.set_listening(true);
        info!(topic = %self.main_topic, "Queue listener started");

        let mut messages = self.subscriber.message_rx();
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    handler.set_listening(false);
                    info!("Queue listener cancelled");
                    return Ok(());
                }
                received = messages.recv() => {
                    match received {
                        Ok(message) => {
                            let Some(payload) = message.value.as_string() else {
                                warn!("Non-string queue envelope, dropping");
                                continue;
                            };
                            let status = handler.handle_push(payload.as_bytes()).await;
                            if status != PushStatus::Ok {
                                warn!(status = status.code(), "Queue envelope not consumed");
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Queue subscriber stream error");
                        }
                    }
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl RetryPublisher for PubSubTopics {
    async fn republish(&self, data: &str, attributes: &HashMap<String, String>) -> AppResult<()> {
        let Some(retry_topic) = self.retry_topic.clone() else {
            return Err(AppError::Queue("no retry topic configured".to_string()));
        };
        let envelope = json!({
            "message": {
                "message_id": attributes
                    .get(MESSAGE_ID_ATTRIBUTE)
                    .cloned()
                    .unwrap_or_default(),
                "data": data,
                "attributes": attributes,
            }
        });
        self.publish_raw(&retry_topic, &envelope.to_string()).await
    }
}
