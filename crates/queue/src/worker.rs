//! Delivery worker.
//!
//! Handles outbox messages: the activity's actor is resolved to its
//! stored key pair, the POST is signed through the common signer, and
//! the response is folded into a structured [`DeliveryError`] for the
//! push handler to classify.

use std::time::Duration;

use async_trait::async_trait;
use fedipress_common::{ActorKeyPair, RequestSigner};
use fedipress_core::services::{MessageKind, QueueMessage};
use fedipress_db::repositories::AccountRepository;
use reqwest::{header, Client};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::classify::DeliveryError;
use crate::push::MessageHandler;

/// Media type of federated payloads.
const ACTIVITY_MEDIA_TYPE: &str = "application/activity+json";

/// Worker that delivers outbox messages to remote inboxes.
#[derive(Clone)]
pub struct DeliveryWorker {
    account_repo: AccountRepository,
    http_client: Client,
    user_agent: String,
}

impl DeliveryWorker {
    /// Create a new delivery worker.
    ///
    /// # Panics
    /// Panics if the HTTP client fails to build.
    #[must_use]
    #[allow(clippy::expect_used)] // Client build only fails with incompatible TLS settings
    pub fn new(account_repo: AccountRepository, user_agent: String, timeout: Duration) -> Self {
        Self {
            account_repo,
            http_client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            user_agent,
        }
    }

    /// The signing key and key id of the actor an activity claims.
    ///
    /// Only internal accounts hold a private key, so a payload whose
    /// actor we never issued keys for is a permanent error.
    async fn resolve_signer(
        &self,
        activity: &Value,
    ) -> Result<(ActorKeyPair, String), DeliveryError> {
        let actor_id = activity
            .get("actor")
            .and_then(Value::as_str)
            .ok_or_else(|| DeliveryError::Other("activity has no actor".to_string()))?;

        let actor = self
            .account_repo
            .find_by_ap_id(actor_id)
            .await
            .map_err(|e| DeliveryError::Other(format!("load actor: {e}")))?
            .ok_or_else(|| DeliveryError::Other(format!("unknown actor {actor_id}")))?;

        let keys = actor
            .ap_private_key
            .as_deref()
            .ok_or_else(|| DeliveryError::Other(format!("actor {actor_id} has no key")))?;
        let keys = ActorKeyPair::from_private_pem(keys)
            .map_err(|e| DeliveryError::Other(format!("actor key: {e}")))?;

        Ok((keys, format!("{}#main-key", actor.ap_id)))
    }

    async fn deliver(&self, inbox: &str, activity: &Value) -> Result<(), DeliveryError> {
        let target =
            Url::parse(inbox).map_err(|e| DeliveryError::Other(format!("bad inbox: {e}")))?;
        let body = serde_json::to_vec(activity)
            .map_err(|e| DeliveryError::Other(format!("encode activity: {e}")))?;

        let (keys, key_id) = self.resolve_signer(activity).await?;
        let signed = RequestSigner::new(&keys, &key_id)
            .sign_post(&target, &body)
            .map_err(|e| DeliveryError::Other(format!("sign: {e}")))?;

        let mut request = self
            .http_client
            .post(target)
            .header(header::CONTENT_TYPE, ACTIVITY_MEDIA_TYPE)
            .header(header::ACCEPT, ACTIVITY_MEDIA_TYPE)
            .header(header::USER_AGENT, &self.user_agent)
            .body(body);
        for (name, value) in signed.iter() {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::from_reqwest(&e, inbox))?;

        let status = response.status();
        if status.is_success() {
            info!(inbox = %inbox, "Activity delivered");
            Ok(())
        } else {
            warn!(inbox = %inbox, status = status.as_u16(), "Delivery rejected");
            Err(DeliveryError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            })
        }
    }
}

#[async_trait]
impl MessageHandler for DeliveryWorker {
    async fn handle(&self, message: QueueMessage) -> Result<(), DeliveryError> {
        match message.kind {
            MessageKind::Outbox => {
                let Some(inbox) = message.inbox.as_deref() else {
                    return Err(DeliveryError::Other(
                        "outbox message without inbox".to_string(),
                    ));
                };
                debug!(message_id = %message.id, inbox = %inbox, "Delivering activity");
                self.deliver(inbox, &message.payload).await
            }
            MessageKind::Inbox => {
                // Inbound processing happens synchronously in the HTTP
                // handler; queued inbox messages are acknowledged.
                debug!(message_id = %message.id, "Acknowledging inbox-pipeline message");
                Ok(())
            }
        }
    }
}
