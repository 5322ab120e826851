//! Create activity processor.

use fedipress_common::{id, AppError, AppResult};
use fedipress_core::services::context::ApContext;
use fedipress_core::services::site::DEFAULT_HANDLE;
use fedipress_db::domain::PostAggregate;
use fedipress_db::entities::account;
use fedipress_db::entities::post::PostAudience;
use fedipress_db::repositories::{AccountRepository, KvRepository, PostRepository, SiteRepository};
use tracing::{debug, info};

use crate::activities::CreateActivity;

/// Processor for inbound Create(Note|Article) activities.
///
/// The canonical object id is the dedupe key: a replayed Create finds
/// the existing post and changes nothing.
#[derive(Clone)]
pub struct CreateProcessor {
    account_repo: AccountRepository,
    post_repo: PostRepository,
    site_repo: SiteRepository,
    kv: KvRepository,
}

impl CreateProcessor {
    /// Create a new create processor.
    #[must_use]
    pub fn new(
        account_repo: AccountRepository,
        post_repo: PostRepository,
        site_repo: SiteRepository,
        kv: KvRepository,
    ) -> Self {
        Self {
            account_repo,
            post_repo,
            site_repo,
            kv,
        }
    }

    /// Process an inbound Create from `sender` for the given site.
    pub async fn process(
        &self,
        ctx: &ApContext,
        activity: &CreateActivity,
        sender: &account::Model,
        site_default: &account::Model,
    ) -> AppResult<()> {
        let object = &activity.object;
        if object.kind != "Note" && object.kind != "Article" {
            return Err(AppError::InvalidType(object.kind.clone()));
        }

        // Find-or-create by canonical object id.
        let post = match self.post_repo.find_by_ap_id(object.id.as_str()).await? {
            Some(existing) => {
                debug!(ap_id = %object.id, "Create replay, post exists");
                existing
            }
            None => self.create_post(activity, sender).await?,
        };

        // Mirror the object itself by its canonical id.
        self.kv
            .set(object.id.as_str(), serde_json::to_value(object)?)
            .await?;

        // Appended to the inbox when the sender is followed by the
        // site's default account, or this replies to one of its posts.
        let followed = self
            .account_repo
            .is_following(&site_default.id, &sender.id)
            .await?;
        let replies_to_us = match &post.in_reply_to {
            Some(parent_id) => self
                .post_repo
                .find_by_id(parent_id)
                .await?
                .is_some_and(|parent| parent.author_id == site_default.id),
            None => false,
        };

        if followed || replies_to_us {
            let conn = self.site_repo.connection();
            KvRepository::prepend_to_list(
                conn.as_ref(),
                &ctx.inbox_list_key(DEFAULT_HANDLE),
                object.id.as_str(),
            )
            .await?;
            info!(ap_id = %object.id, "Appended to inbox collection");
        }
        Ok(())
    }

    async fn create_post(
        &self,
        activity: &CreateActivity,
        sender: &account::Model,
    ) -> AppResult<fedipress_db::entities::post::Model> {
        let object = &activity.object;
        let published = object.published.unwrap_or_else(chrono::Utc::now);
        let content = object.content.clone().unwrap_or_default();

        // Resolve the parent for replies, when we hold it.
        let parent = match &object.in_reply_to {
            Some(parent_url) => self.post_repo.find_by_ap_id(parent_url.as_str()).await?,
            None => None,
        };

        let mut aggregate = if object.kind == "Article" {
            PostAggregate::new_article(
                &sender.id,
                &id::public_uuid(),
                object.id.as_str(),
                object.name.clone().unwrap_or_default(),
                object.content.clone(),
                object.summary.clone(),
                object_url(object),
                None,
                published,
                None,
            )
        } else if let Some(parent) = &parent {
            PostAggregate::new_reply(
                &sender.id,
                &id::public_uuid(),
                object.id.as_str(),
                content,
                parent,
                PostAudience::Public,
                published,
            )
        } else {
            PostAggregate::new_note(
                &sender.id,
                &id::public_uuid(),
                object.id.as_str(),
                content,
                PostAudience::Public,
                published,
            )
        };

        // Mentions of local accounts feed the notification projection.
        let mut mentioned = Vec::new();
        for href in object.mentioned_actors() {
            if let Some(account) = self.account_repo.find_by_ap_id(href.as_str()).await? {
                mentioned.push(account.id);
            }
        }
        aggregate.set_mentions(mentioned);

        self.post_repo.save(&mut aggregate).await?;
        info!(ap_id = %object.id, post_id = %aggregate.model.id, "Created post from federation");
        Ok(aggregate.model)
    }
}

/// Best-effort `url` field extraction (string or Link object).
fn object_url(object: &crate::activities::ApObject) -> Option<String> {
    match &object.url {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Object(o)) => o
            .get("href")
            .and_then(serde_json::Value::as_str)
            .map(std::string::ToString::to_string),
        _ => None,
    }
}
