//! Undo activity processor.

use fedipress_common::AppResult;
use fedipress_db::domain::AccountAggregate;
use fedipress_db::entities::account;
use fedipress_db::repositories::{AccountRepository, KvRepository, PostRepository};
use serde_json::Value;
use tracing::{debug, info};

use crate::activities::UndoActivity;
use crate::client::DocumentLoader;

/// Processor for inbound Undo activities.
///
/// Determines what is being undone (Follow, Like or Announce) from the
/// embedded object, the KV mirror of the original activity, or a
/// remote fetch, and reverses it. Undoing something that never applied
/// is success: ordering across activities is not guaranteed.
#[derive(Clone)]
pub struct UndoProcessor {
    account_repo: AccountRepository,
    post_repo: PostRepository,
    kv: KvRepository,
    loader: DocumentLoader,
}

impl UndoProcessor {
    /// Create a new undo processor.
    #[must_use]
    pub fn new(
        account_repo: AccountRepository,
        post_repo: PostRepository,
        kv: KvRepository,
        loader: DocumentLoader,
    ) -> Self {
        Self {
            account_repo,
            post_repo,
            kv,
            loader,
        }
    }

    /// Process an inbound Undo from `sender` against the site's
    /// default account.
    pub async fn process(
        &self,
        activity: &UndoActivity,
        sender: &account::Model,
        site_default: &account::Model,
    ) -> AppResult<()> {
        let undone = self.resolve_undone_object(activity).await;
        let Some(undone) = undone else {
            debug!(id = %activity.id, "Undo of unknown activity, acking");
            return Ok(());
        };

        let object_type = undone
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let inner_object = undone
            .get("object")
            .and_then(|o| {
                o.as_str().map(std::string::ToString::to_string).or_else(|| {
                    o.get("id")
                        .and_then(Value::as_str)
                        .map(std::string::ToString::to_string)
                })
            })
            .unwrap_or_default();

        match object_type.as_str() {
            "Follow" => {
                let mut aggregate = AccountAggregate::new(sender.clone());
                aggregate.unfollow(&site_default.id);
                self.account_repo.save(&mut aggregate).await?;
                info!(follower = %sender.ap_id, "Undo(Follow) applied");
            }
            "Like" => {
                if let Some(post) = self.post_repo.find_by_ap_id(&inner_object).await? {
                    let removed = self.post_repo.remove_like(&post.id, &sender.id).await?;
                    debug!(post = %post.id, removed, "Undo(Like) applied");
                }
            }
            "Announce" => {
                if let Some(post) = self.post_repo.find_by_ap_id(&inner_object).await? {
                    let removed = self.post_repo.remove_repost(&post.id, &sender.id).await?;
                    debug!(post = %post.id, removed, "Undo(Announce) applied");
                }
            }
            other => {
                debug!(object_type = other, "Undo of unsupported type, acking");
            }
        }
        Ok(())
    }

    /// The activity being undone, as JSON.
    async fn resolve_undone_object(&self, activity: &UndoActivity) -> Option<Value> {
        // Embedded objects carry everything we need.
        if let Some(embedded) = activity.object.embedded() {
            if embedded.get("type").is_some() {
                return Some(embedded.clone());
            }
        }
        let id = activity.object.id()?;

        // The KV mirror has it if the original passed through us.
        if let Ok(Some(cached)) = self.kv.get(id.as_str()).await {
            return Some(cached);
        }
        // Last resort: fetch it.
        self.loader.fetch_document(id.as_str()).await.ok()
    }
}
