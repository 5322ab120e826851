//! Follow activity processor.

use fedipress_common::{id, AppResult};
use fedipress_core::services::{
    context::{activitystreams_context, ApContext},
    QueueMessage, QueueService,
};
use fedipress_db::domain::AccountAggregate;
use fedipress_db::entities::account;
use fedipress_db::repositories::{AccountRepository, KvRepository};
use serde_json::json;
use tracing::info;

use crate::activities::FollowActivity;

/// Processor for inbound Follow activities.
///
/// Records the follow edge and queues a signed `Accept(Follow)` back
/// to the sender's inbox. Replays converge: the edge insert is
/// idempotent and a fresh Accept for an existing edge is harmless.
#[derive(Clone)]
pub struct FollowProcessor {
    account_repo: AccountRepository,
    kv: KvRepository,
    queue: QueueService,
}

impl FollowProcessor {
    /// Create a new follow processor.
    #[must_use]
    pub fn new(account_repo: AccountRepository, kv: KvRepository, queue: QueueService) -> Self {
        Self {
            account_repo,
            kv,
            queue,
        }
    }

    /// Process an inbound Follow from `sender` targeting the site's
    /// default account.
    pub async fn process(
        &self,
        ctx: &ApContext,
        activity: &FollowActivity,
        sender: &account::Model,
        followee: &account::Model,
    ) -> AppResult<()> {
        let mut aggregate = AccountAggregate::new(sender.clone());
        aggregate.follow(&followee.id);
        self.account_repo.save(&mut aggregate).await?;

        let accept_id = ctx.activity_uri("accept", &id::public_uuid());
        let accept = json!({
            "@context": activitystreams_context(),
            "id": accept_id,
            "type": "Accept",
            "actor": followee.ap_id,
            "to": [sender.ap_id],
            "object": {
                "id": activity.id.as_str(),
                "type": "Follow",
                "actor": sender.ap_id,
                "object": followee.ap_id,
            },
        });
        self.kv.set(&accept_id, accept.clone()).await?;

        let inbox = sender
            .ap_shared_inbox_url
            .clone()
            .unwrap_or_else(|| sender.ap_inbox_url.clone());
        self.queue
            .enqueue(QueueMessage::outbox(id::row_id(), inbox, accept))
            .await?;

        info!(
            follower = %sender.ap_id,
            followee = %followee.ap_id,
            "Follow recorded, Accept queued"
        );
        Ok(())
    }
}
