//! Outbox service.
//!
//! Builds activities for local actions, persists them in the KV store,
//! mirrors them into the tenant's outbox collection, and queues them
//! for delivery. Every operation returns a tagged outcome; expected
//! alternatives (already-following, self-follow, …) are not errors.

use chrono::Utc;
use fedipress_common::{id, AppError, AppResult};
use fedipress_db::domain::PostAggregate;
use fedipress_db::entities::{account, post, site};
use fedipress_db::repositories::{
    AccountRepository, GhostMappingRepository, KvRepository, PostRepository, SiteRepository,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::context::{activitystreams_context, ApContext, PUBLIC_COLLECTION};
use super::delivery::{QueueMessage, QueueService};
use super::lookup::{LookupService, ResolvedActor};
use super::site::DEFAULT_HANDLE;
use super::webhook::GhostPost;

/// Outcome of a local follow action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowOutcome {
    /// Edge recorded; `Follow` dispatched for external targets.
    Followed,
    /// Edge already existed.
    AlreadyFollowing,
    /// Target is the acting account.
    SelfFollow,
}

/// Outcome of a local unfollow action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnfollowOutcome {
    /// Edge removed; `Undo(Follow)` dispatched for external targets.
    Unfollowed,
    /// No edge existed.
    NotFollowing,
    /// Target is the acting account.
    SelfFollow,
}

/// Outcome of a like or unlike action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked,
    AlreadyLiked,
    Unliked,
    NotLiked,
}

/// Outcome of a repost or derepost action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepostOutcome {
    Reposted,
    AlreadyReposted,
    Dereposted,
    NotReposted,
}

/// Outcome of a note or reply creation.
#[derive(Debug, Clone)]
pub struct NoteOutcome {
    /// The persisted post.
    pub post: post::Model,
    /// Canonical id of the dispatched `Create` activity.
    pub activity_id: String,
}

/// Outcome of a webhook-driven article operation.
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// A new Article was federated.
    Published(post::Model),
    /// An existing Article was re-rendered and `Update` dispatched.
    Updated(post::Model),
    /// The `(author, uuid)` pair was already published.
    AlreadyExists,
    /// Non-public content; the mapped post (if any) was soft-deleted.
    PrivateContent { deleted_existing: bool },
    /// No HTML content; the mapped post (if any) was soft-deleted.
    MissingContent { deleted_existing: bool },
    /// The mapped post was soft-deleted and `Delete` dispatched.
    Deleted,
    /// Nothing mapped to the given uuid.
    NotFound,
}

/// Outbox service for local federated actions.
#[derive(Clone)]
pub struct OutboxService {
    account_repo: AccountRepository,
    post_repo: PostRepository,
    site_repo: SiteRepository,
    mapping_repo: GhostMappingRepository,
    kv: KvRepository,
    queue: QueueService,
    lookup: LookupService,
}

impl OutboxService {
    /// Create a new outbox service.
    #[must_use]
    pub fn new(
        account_repo: AccountRepository,
        post_repo: PostRepository,
        site_repo: SiteRepository,
        mapping_repo: GhostMappingRepository,
        kv: KvRepository,
        queue: QueueService,
        lookup: LookupService,
    ) -> Self {
        Self {
            account_repo,
            post_repo,
            site_repo,
            mapping_repo,
            kv,
            queue,
            lookup,
        }
    }

    // === Follow / Unfollow ===

    /// Follow a target identified by handle (`@user@host`) or URL.
    pub async fn follow(&self, site: &site::Model, target: &str) -> AppResult<FollowOutcome> {
        let actor = self.account_repo.get_by_site(&site.id).await?;
        let target = self.resolve_target(target).await?;

        if target.id == actor.id {
            return Ok(FollowOutcome::SelfFollow);
        }
        if self.account_repo.is_following(&actor.id, &target.id).await? {
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        let mut aggregate = fedipress_db::domain::AccountAggregate::new(actor.clone());
        aggregate.follow(&target.id);
        self.account_repo.save(&mut aggregate).await?;

        if target.ap_private_key.is_none() {
            let ctx = ApContext::new(&site.host);
            let activity_id = ctx.activity_uri("follow", &id::public_uuid());
            let activity = json!({
                "@context": activitystreams_context(),
                "id": activity_id,
                "type": "Follow",
                "actor": actor.ap_id,
                "object": target.ap_id,
                "to": [target.ap_id],
            });
            self.persist_and_dispatch(&ctx, &activity_id, &activity, vec![target.ap_inbox_url])
                .await?;
        }

        info!(site = %site.host, target = %target.ap_id, "Recorded follow");
        Ok(FollowOutcome::Followed)
    }

    /// Unfollow a target identified by handle or URL.
    pub async fn unfollow(&self, site: &site::Model, target: &str) -> AppResult<UnfollowOutcome> {
        let actor = self.account_repo.get_by_site(&site.id).await?;
        let target = self.resolve_target(target).await?;

        if target.id == actor.id {
            return Ok(UnfollowOutcome::SelfFollow);
        }
        if !self.account_repo.is_following(&actor.id, &target.id).await? {
            return Ok(UnfollowOutcome::NotFollowing);
        }

        let mut aggregate = fedipress_db::domain::AccountAggregate::new(actor.clone());
        aggregate.unfollow(&target.id);
        self.account_repo.save(&mut aggregate).await?;

        if target.ap_private_key.is_none() {
            let ctx = ApContext::new(&site.host);
            let activity_id = ctx.activity_uri("undo", &id::public_uuid());
            let activity = json!({
                "@context": activitystreams_context(),
                "id": activity_id,
                "type": "Undo",
                "actor": actor.ap_id,
                "to": [target.ap_id],
                "object": {
                    "type": "Follow",
                    "actor": actor.ap_id,
                    "object": target.ap_id,
                },
            });
            self.persist_and_dispatch(&ctx, &activity_id, &activity, vec![target.ap_inbox_url])
                .await?;
        }

        Ok(UnfollowOutcome::Unfollowed)
    }

    // === Like / Unlike ===

    /// Like a post by its canonical object URL.
    pub async fn like(&self, site: &site::Model, object_url: &str) -> AppResult<LikeOutcome> {
        let actor = self.account_repo.get_by_site(&site.id).await?;
        let post = self.require_post(object_url).await?;

        if !self.post_repo.add_like(&post.id, &actor.id).await? {
            return Ok(LikeOutcome::AlreadyLiked);
        }

        let author = self.account_repo.get_by_id(&post.author_id).await?;
        let ctx = ApContext::new(&site.host);
        let activity_id = ctx.activity_uri("like", &id::public_uuid());
        let activity = json!({
            "@context": activitystreams_context(),
            "id": activity_id,
            "type": "Like",
            "actor": actor.ap_id,
            "object": post.ap_id,
            "to": [author.ap_id],
        });
        let targets = external_inboxes([&author]);
        self.persist_and_dispatch(&ctx, &activity_id, &activity, targets)
            .await?;

        Ok(LikeOutcome::Liked)
    }

    /// Withdraw a like.
    pub async fn unlike(&self, site: &site::Model, object_url: &str) -> AppResult<LikeOutcome> {
        let actor = self.account_repo.get_by_site(&site.id).await?;
        let post = self.require_post(object_url).await?;

        if !self.post_repo.remove_like(&post.id, &actor.id).await? {
            return Ok(LikeOutcome::NotLiked);
        }

        let author = self.account_repo.get_by_id(&post.author_id).await?;
        let ctx = ApContext::new(&site.host);
        let activity_id = ctx.activity_uri("undo", &id::public_uuid());
        let activity = json!({
            "@context": activitystreams_context(),
            "id": activity_id,
            "type": "Undo",
            "actor": actor.ap_id,
            "to": [author.ap_id],
            "object": {
                "type": "Like",
                "actor": actor.ap_id,
                "object": post.ap_id,
            },
        });
        let targets = external_inboxes([&author]);
        self.persist_and_dispatch(&ctx, &activity_id, &activity, targets)
            .await?;

        Ok(LikeOutcome::Unliked)
    }

    // === Repost / Derepost ===

    /// Announce a post to the actor's followers.
    pub async fn repost(&self, site: &site::Model, object_url: &str) -> AppResult<RepostOutcome> {
        let actor = self.account_repo.get_by_site(&site.id).await?;
        let post = self.require_post(object_url).await?;

        if !self.post_repo.add_repost(&post.id, &actor.id).await? {
            return Ok(RepostOutcome::AlreadyReposted);
        }

        let author = self.account_repo.get_by_id(&post.author_id).await?;
        let ctx = ApContext::new(&site.host);
        let activity_id = ctx.activity_uri("announce", &id::public_uuid());
        let activity = json!({
            "@context": activitystreams_context(),
            "id": activity_id,
            "type": "Announce",
            "actor": actor.ap_id,
            "object": post.ap_id,
            "to": [PUBLIC_COLLECTION],
            "cc": [ctx.followers_uri(DEFAULT_HANDLE)],
        });

        let mut targets = self.account_repo.follower_inboxes(&actor.id).await?;
        for inbox in external_inboxes([&author]) {
            if !targets.contains(&inbox) {
                targets.push(inbox);
            }
        }
        self.persist_and_dispatch(&ctx, &activity_id, &activity, targets)
            .await?;

        Ok(RepostOutcome::Reposted)
    }

    /// Withdraw an announce.
    pub async fn derepost(&self, site: &site::Model, object_url: &str) -> AppResult<RepostOutcome> {
        let actor = self.account_repo.get_by_site(&site.id).await?;
        let post = self.require_post(object_url).await?;

        if !self.post_repo.remove_repost(&post.id, &actor.id).await? {
            return Ok(RepostOutcome::NotReposted);
        }

        let author = self.account_repo.get_by_id(&post.author_id).await?;
        let ctx = ApContext::new(&site.host);
        let activity_id = ctx.activity_uri("undo", &id::public_uuid());
        let activity = json!({
            "@context": activitystreams_context(),
            "id": activity_id,
            "type": "Undo",
            "actor": actor.ap_id,
            "to": [PUBLIC_COLLECTION],
            "cc": [ctx.followers_uri(DEFAULT_HANDLE)],
            "object": {
                "type": "Announce",
                "actor": actor.ap_id,
                "object": post.ap_id,
            },
        });

        let mut targets = self.account_repo.follower_inboxes(&actor.id).await?;
        for inbox in external_inboxes([&author]) {
            if !targets.contains(&inbox) {
                targets.push(inbox);
            }
        }
        self.persist_and_dispatch(&ctx, &activity_id, &activity, targets)
            .await?;

        Ok(RepostOutcome::Dereposted)
    }

    // === Note / Reply ===

    /// Create a public note and deliver it to all followers.
    pub async fn create_note(&self, site: &site::Model, content: &str) -> AppResult<NoteOutcome> {
        let actor = self.account_repo.get_by_site(&site.id).await?;
        let ctx = ApContext::new(&site.host);
        let uuid = id::public_uuid();

        let mut aggregate = PostAggregate::new_note(
            &actor.id,
            &uuid,
            &ctx.note_uri(&uuid),
            content.to_string(),
            post::PostAudience::Public,
            Utc::now(),
        );
        self.post_repo.save(&mut aggregate).await?;

        let activity_id = self
            .dispatch_create(&ctx, &actor, &aggregate.model, None)
            .await?;
        Ok(NoteOutcome {
            post: aggregate.model,
            activity_id,
        })
    }

    /// Reply to a post identified by its canonical object URL.
    pub async fn reply(
        &self,
        site: &site::Model,
        target_url: &str,
        content: &str,
    ) -> AppResult<NoteOutcome> {
        let actor = self.account_repo.get_by_site(&site.id).await?;
        let parent = self.require_post(target_url).await?;
        let ctx = ApContext::new(&site.host);
        let uuid = id::public_uuid();

        let mut aggregate = PostAggregate::new_reply(
            &actor.id,
            &uuid,
            &ctx.note_uri(&uuid),
            content.to_string(),
            &parent,
            post::PostAudience::Public,
            Utc::now(),
        );
        self.post_repo.save(&mut aggregate).await?;

        let parent_author = self.account_repo.get_by_id(&parent.author_id).await?;
        let activity_id = self
            .dispatch_create(&ctx, &actor, &aggregate.model, Some(&parent_author))
            .await?;
        Ok(NoteOutcome {
            post: aggregate.model,
            activity_id,
        })
    }

    // === Webhook-driven articles ===

    /// Federate a published blog post as an Article, idempotently per
    /// `(author, uuid)`.
    pub async fn publish_article_from_webhook(
        &self,
        site: &site::Model,
        ghost_post: &GhostPost,
    ) -> AppResult<PublishOutcome> {
        let actor = self.account_repo.get_by_site(&site.id).await?;

        if ghost_post.visibility != super::webhook::GhostVisibility::Public {
            let deleted = self.delete_mapped_post(site, &actor, &ghost_post.uuid).await?;
            return Ok(PublishOutcome::PrivateContent {
                deleted_existing: deleted,
            });
        }
        if !ghost_post.has_content() {
            let deleted = self.delete_mapped_post(site, &actor, &ghost_post.uuid).await?;
            return Ok(PublishOutcome::MissingContent {
                deleted_existing: deleted,
            });
        }

        let ctx = ApContext::new(&site.host);
        let ap_id = ctx.article_uri(&ghost_post.uuid);

        match self.mapping_repo.insert(&ghost_post.uuid, &ap_id).await {
            Ok(_) => {}
            Err(AppError::Conflict(_)) => return Ok(PublishOutcome::AlreadyExists),
            Err(e) => return Err(e),
        }

        let metadata = ghost_post
            .authors
            .as_ref()
            .map(|authors| json!({ "ghostAuthors": authors }));
        let mut aggregate = PostAggregate::new_article(
            &actor.id,
            &ghost_post.uuid,
            &ap_id,
            ghost_post.title.clone().unwrap_or_default(),
            ghost_post.html.clone(),
            ghost_post.effective_excerpt(),
            ghost_post.url.clone(),
            ghost_post.feature_image.clone(),
            ghost_post.published_at.unwrap_or_else(Utc::now),
            metadata,
        );
        self.post_repo.save(&mut aggregate).await?;

        self.dispatch_create(&ctx, &actor, &aggregate.model, None)
            .await?;
        Ok(PublishOutcome::Published(aggregate.model))
    }

    /// Re-render a previously federated Article after a blog edit.
    ///
    /// Falls back to publishing when the uuid was never federated.
    pub async fn update_article_from_webhook(
        &self,
        site: &site::Model,
        ghost_post: &GhostPost,
    ) -> AppResult<PublishOutcome> {
        let Some(mapping) = self.mapping_repo.find_by_ghost_uuid(&ghost_post.uuid).await? else {
            return self.publish_article_from_webhook(site, ghost_post).await;
        };

        let actor = self.account_repo.get_by_site(&site.id).await?;
        if ghost_post.visibility != super::webhook::GhostVisibility::Public
            || !ghost_post.has_content()
        {
            let deleted = self.delete_mapped_post(site, &actor, &ghost_post.uuid).await?;
            return Ok(PublishOutcome::PrivateContent {
                deleted_existing: deleted,
            });
        }

        let Some(model) = self.post_repo.find_by_ap_id(&mapping.ap_id).await? else {
            return Ok(PublishOutcome::NotFound);
        };
        let mut aggregate = PostAggregate::from_model(model);
        aggregate.update_content(
            ghost_post.title.clone(),
            ghost_post.html.clone(),
            ghost_post.effective_excerpt(),
            ghost_post.url.clone(),
            ghost_post.feature_image.clone(),
        )?;
        self.post_repo.save(&mut aggregate).await?;

        let ctx = ApContext::new(&site.host);
        let activity_id = ctx.activity_uri("update", &id::public_uuid());
        let object = article_object(&ctx, &actor, &aggregate.model);
        let activity = json!({
            "@context": activitystreams_context(),
            "id": activity_id,
            "type": "Update",
            "actor": actor.ap_id,
            "object": object,
            "to": [PUBLIC_COLLECTION],
            "cc": [ctx.followers_uri(DEFAULT_HANDLE)],
        });
        let targets = self.account_repo.follower_inboxes(&actor.id).await?;
        self.persist_and_dispatch(&ctx, &activity_id, &activity, targets)
            .await?;

        Ok(PublishOutcome::Updated(aggregate.model))
    }

    /// Unfederate a deleted blog post.
    pub async fn delete_article_from_webhook(
        &self,
        site: &site::Model,
        ghost_uuid: &str,
    ) -> AppResult<PublishOutcome> {
        let actor = self.account_repo.get_by_site(&site.id).await?;
        if self.delete_mapped_post(site, &actor, ghost_uuid).await? {
            Ok(PublishOutcome::Deleted)
        } else {
            Ok(PublishOutcome::NotFound)
        }
    }

    /// Soft-delete the post mapped to a blog uuid, dispatching
    /// `Delete` to followers. Returns whether anything was deleted.
    async fn delete_mapped_post(
        &self,
        site: &site::Model,
        actor: &account::Model,
        ghost_uuid: &str,
    ) -> AppResult<bool> {
        let Some(mapping) = self.mapping_repo.find_by_ghost_uuid(ghost_uuid).await? else {
            return Ok(false);
        };
        let Some(model) = self.post_repo.find_by_ap_id(&mapping.ap_id).await? else {
            return Ok(false);
        };
        if model.deleted_at.is_some() {
            return Ok(false);
        }

        let mut aggregate = PostAggregate::from_model(model);
        aggregate.delete(&actor.id)?;
        self.post_repo.save(&mut aggregate).await?;

        let ctx = ApContext::new(&site.host);
        let activity_id = ctx.activity_uri("delete", &id::public_uuid());
        let activity = json!({
            "@context": activitystreams_context(),
            "id": activity_id,
            "type": "Delete",
            "actor": actor.ap_id,
            "object": aggregate.model.ap_id,
            "to": [PUBLIC_COLLECTION],
            "cc": [ctx.followers_uri(DEFAULT_HANDLE)],
        });
        let targets = self.account_repo.follower_inboxes(&actor.id).await?;
        self.persist_and_dispatch(&ctx, &activity_id, &activity, targets)
            .await?;
        Ok(true)
    }

    // === Shared plumbing ===

    /// Build and dispatch the `Create` for a freshly persisted post.
    async fn dispatch_create(
        &self,
        ctx: &ApContext,
        actor: &account::Model,
        model: &post::Model,
        reply_target_author: Option<&account::Model>,
    ) -> AppResult<String> {
        let object = match model.post_type {
            post::PostType::Article => article_object(ctx, actor, model),
            post::PostType::Note => note_object(ctx, actor, model, reply_target_author),
        };
        let activity_id = ctx.activity_uri("create", &model.uuid);
        let (to, cc) = addressing(ctx, model.audience, reply_target_author);
        let mut activity = json!({
            "@context": activitystreams_context(),
            "id": activity_id,
            "type": "Create",
            "actor": actor.ap_id,
            "object": object,
            "to": to,
            "published": model.published_at.to_rfc3339(),
        });
        if let Some(cc) = cc {
            activity["cc"] = cc;
        }

        self.kv
            .set(&model.ap_id, activity["object"].clone())
            .await?;

        let mut targets = match model.audience {
            post::PostAudience::Direct => Vec::new(),
            _ => self.account_repo.follower_inboxes(&actor.id).await?,
        };
        if let Some(author) = reply_target_author {
            for inbox in external_inboxes([author]) {
                if !targets.contains(&inbox) {
                    targets.push(inbox);
                }
            }
        }
        self.persist_and_dispatch(ctx, &activity_id, &activity, targets)
            .await?;
        Ok(activity_id)
    }

    /// Store an activity, mirror it into the outbox collection, and
    /// enqueue one message per recipient inbox.
    async fn persist_and_dispatch(
        &self,
        ctx: &ApContext,
        activity_id: &str,
        activity: &Value,
        inboxes: Vec<String>,
    ) -> AppResult<()> {
        self.kv.set(activity_id, activity.clone()).await?;

        let conn = self.site_repo.connection();
        KvRepository::prepend_to_list(
            conn.as_ref(),
            &ctx.outbox_list_key(DEFAULT_HANDLE),
            activity_id,
        )
        .await?;

        for inbox in inboxes {
            let message = QueueMessage::outbox(
                id::row_id(),
                inbox.clone(),
                activity.clone(),
            );
            if let Err(e) = self.queue.enqueue(message).await {
                warn!(inbox = %inbox, error = %e, "Failed to enqueue delivery");
            }
        }
        Ok(())
    }

    /// Resolve a follow/unfollow target to a stored account,
    /// creating an external row on first contact.
    async fn resolve_target(&self, query: &str) -> AppResult<account::Model> {
        // A URL that already maps to a stored account needs no lookup.
        if query.starts_with("https://") || query.starts_with("http://") {
            if let Some(existing) = self.account_repo.find_by_ap_id(query).await? {
                return Ok(existing);
            }
        }

        let resolved = self.lookup.resolve(query).await?;
        if let Some(existing) = self.account_repo.find_by_ap_id(&resolved.ap_id).await? {
            return Ok(existing);
        }
        self.create_external(resolved).await
    }

    async fn create_external(&self, resolved: ResolvedActor) -> AppResult<account::Model> {
        let model =
            resolved.into_active_model(id::row_id(), id::public_uuid())?;
        self.account_repo.create(model).await
    }

    async fn require_post(&self, object_url: &str) -> AppResult<post::Model> {
        let post = self
            .post_repo
            .find_by_ap_id(object_url)
            .await?
            .ok_or_else(|| AppError::PostNotFound(object_url.to_string()))?;
        if post.deleted_at.is_some() {
            return Err(AppError::PostNotFound(object_url.to_string()));
        }
        Ok(post)
    }
}

/// Inboxes of the given accounts that are external (internal accounts
/// receive nothing over HTTP).
fn external_inboxes<'a, I>(accounts: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a account::Model>,
{
    accounts
        .into_iter()
        .filter(|a| a.ap_private_key.is_none())
        .map(|a| {
            a.ap_shared_inbox_url
                .clone()
                .unwrap_or_else(|| a.ap_inbox_url.clone())
        })
        .collect()
}

/// Addressing for an outbound activity.
///
/// Public: `to` the public collection, `cc` the followers collection.
/// Followers-only: `to` the followers collection, no public id.
/// Direct: `to` the recipient only, no cc.
fn addressing(
    ctx: &ApContext,
    audience: post::PostAudience,
    direct_recipient: Option<&account::Model>,
) -> (Value, Option<Value>) {
    match audience {
        post::PostAudience::Public => (
            json!([PUBLIC_COLLECTION]),
            Some(json!([ctx.followers_uri(DEFAULT_HANDLE)])),
        ),
        post::PostAudience::FollowersOnly => {
            (json!([ctx.followers_uri(DEFAULT_HANDLE)]), None)
        }
        post::PostAudience::Direct => {
            let recipient = direct_recipient
                .map(|a| a.ap_inbox_url.clone())
                .unwrap_or_default();
            (json!([recipient]), None)
        }
    }
}

/// Render an Article object.
fn article_object(ctx: &ApContext, actor: &account::Model, model: &post::Model) -> Value {
    let mut object = json!({
        "id": model.ap_id,
        "type": "Article",
        "attributedTo": actor.ap_id,
        "name": model.title,
        "content": model.content,
        "published": model.published_at.to_rfc3339(),
        "to": [PUBLIC_COLLECTION],
        "cc": [ctx.followers_uri(DEFAULT_HANDLE)],
    });
    if let Some(url) = &model.url {
        object["url"] = json!(url);
    }
    if let Some(image) = &model.image_url {
        object["image"] = json!({ "type": "Image", "url": image });
    }
    if let Some(excerpt) = &model.excerpt {
        object["preview"] = json!({ "type": "Note", "content": excerpt });
    }
    object
}

/// Render a Note object.
fn note_object(
    ctx: &ApContext,
    actor: &account::Model,
    model: &post::Model,
    reply_target_author: Option<&account::Model>,
) -> Value {
    let (to, cc) = addressing(ctx, model.audience, reply_target_author);
    let mut object = json!({
        "id": model.ap_id,
        "type": "Note",
        "attributedTo": actor.ap_id,
        "content": model.content,
        "published": model.published_at.to_rfc3339(),
        "to": to,
    });
    if let Some(cc) = cc {
        object["cc"] = cc;
    }
    object
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use fedipress_common::{ap_id_hash, domain_hash};

    #[test]
    fn test_public_addressing() {
        let ctx = ApContext::new("blog.example");
        let (to, cc) = addressing(&ctx, post::PostAudience::Public, None);
        assert_eq!(to, json!([PUBLIC_COLLECTION]));
        assert_eq!(
            cc.unwrap(),
            json!(["https://blog.example/.ghost/activitypub/followers/index"])
        );
    }

    #[test]
    fn test_followers_only_addressing_omits_public() {
        let ctx = ApContext::new("blog.example");
        let (to, cc) = addressing(&ctx, post::PostAudience::FollowersOnly, None);
        assert!(!to.to_string().contains("#Public"));
        assert!(cc.is_none());
    }

    #[test]
    fn test_direct_addressing_targets_recipient_only() {
        let ctx = ApContext::new("blog.example");
        let recipient = account::Model {
            id: "a2".to_string(),
            uuid: None,
            username: "alice".to_string(),
            name: None,
            bio: None,
            avatar_url: None,
            banner_image_url: None,
            url: None,
            ap_id: "https://mastodon.example/users/alice".to_string(),
            ap_id_hash: ap_id_hash("https://mastodon.example/users/alice"),
            ap_inbox_url: "https://mastodon.example/users/alice/inbox".to_string(),
            ap_shared_inbox_url: None,
            ap_outbox_url: None,
            ap_followers_url: None,
            ap_following_url: None,
            ap_liked_url: None,
            ap_public_key: None,
            ap_private_key: None,
            domain: "mastodon.example".to_string(),
            domain_hash: domain_hash("mastodon.example"),
            created_at: Utc::now().into(),
            updated_at: None,
            deleted_at: None,
        };

        let (to, cc) = addressing(&ctx, post::PostAudience::Direct, Some(&recipient));
        assert_eq!(
            to,
            json!(["https://mastodon.example/users/alice/inbox"])
        );
        assert!(cc.is_none());
        assert!(!to.to_string().contains("#Public"));
    }
}
