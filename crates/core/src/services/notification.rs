//! Notification projection.
//!
//! Derives notifications from like/repost/reply/follow/mention events.
//! Nothing is created when the recipient's account blocks the acting
//! account or its domain, a reply that also mentions its target
//! produces a single reply notification, and blocking an account
//! purges every notification it previously caused.

use fedipress_common::AppResult;
use fedipress_db::domain::DomainEvent;
use fedipress_db::entities::notification::NotificationEventType;
use fedipress_db::repositories::{
    AccountRepository, NotificationRepository, PostRepository, SiteRepository,
};
use tracing::debug;

/// Notification projection subscriber.
#[derive(Clone)]
pub struct NotificationProjection {
    account_repo: AccountRepository,
    site_repo: SiteRepository,
    post_repo: PostRepository,
    notification_repo: NotificationRepository,
}

impl NotificationProjection {
    /// Create a new notification projection.
    #[must_use]
    pub const fn new(
        account_repo: AccountRepository,
        site_repo: SiteRepository,
        post_repo: PostRepository,
        notification_repo: NotificationRepository,
    ) -> Self {
        Self {
            account_repo,
            site_repo,
            post_repo,
            notification_repo,
        }
    }

    /// Handle one domain event.
    pub async fn handle_event(&self, event: DomainEvent) -> AppResult<()> {
        match event {
            DomainEvent::PostLiked {
                post_id,
                author_id,
                account_id,
            } => {
                self.notify(
                    &author_id,
                    &account_id,
                    NotificationEventType::Like,
                    Some(post_id),
                    None,
                )
                .await
            }
            DomainEvent::PostReposted {
                post_id,
                author_id,
                account_id,
            } => {
                self.notify(
                    &author_id,
                    &account_id,
                    NotificationEventType::Repost,
                    Some(post_id),
                    None,
                )
                .await
            }
            DomainEvent::PostCreated {
                post_id,
                author_id,
                in_reply_to,
                mentioned_account_ids,
                ..
            } => {
                self.project_created(&post_id, &author_id, in_reply_to, &mentioned_account_ids)
                    .await
            }
            DomainEvent::AccountFollowed {
                follower_id,
                following_id,
            } => {
                self.notify(
                    &following_id,
                    &follower_id,
                    NotificationEventType::Follow,
                    None,
                    None,
                )
                .await
            }
            DomainEvent::AccountBlocked {
                blocker_id,
                blocked_id,
            } => {
                if let Some(user) = self.site_repo.find_user_by_account(&blocker_id).await? {
                    let purged = self
                        .notification_repo
                        .purge_from_account(&user.id, &blocked_id)
                        .await?;
                    debug!(user = %user.id, purged, "Purged notifications after block");
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn project_created(
        &self,
        post_id: &str,
        author_id: &str,
        in_reply_to: Option<String>,
        mentioned_account_ids: &[String],
    ) -> AppResult<()> {
        // Reply notification for the parent's author.
        let mut reply_recipient: Option<String> = None;
        if let Some(parent_id) = in_reply_to {
            if let Some(parent) = self.post_repo.find_by_id(&parent_id).await? {
                reply_recipient = Some(parent.author_id.clone());
                self.notify(
                    &parent.author_id,
                    author_id,
                    NotificationEventType::Reply,
                    Some(post_id.to_string()),
                    Some(parent_id),
                )
                .await?;
            }
        }

        // Mention notifications, minus the reply target (a reply that
        // both mentions and targets the same recipient produces only
        // the reply notification).
        for mentioned in mentioned_account_ids {
            if reply_recipient.as_deref() == Some(mentioned.as_str()) {
                continue;
            }
            self.notify(
                mentioned,
                author_id,
                NotificationEventType::Mention,
                Some(post_id.to_string()),
                None,
            )
            .await?;
        }
        Ok(())
    }

    /// Create one notification, subject to the moderation gates.
    async fn notify(
        &self,
        recipient_account_id: &str,
        actor_account_id: &str,
        event_type: NotificationEventType,
        post_id: Option<String>,
        in_reply_to_post_id: Option<String>,
    ) -> AppResult<()> {
        if recipient_account_id == actor_account_id {
            return Ok(());
        }
        // Only tenant users receive notifications.
        let Some(user) = self
            .site_repo
            .find_user_by_account(recipient_account_id)
            .await?
        else {
            return Ok(());
        };

        if self
            .account_repo
            .blocks(recipient_account_id, actor_account_id)
            .await?
        {
            return Ok(());
        }
        let actor = self.account_repo.get_by_id(actor_account_id).await?;
        if self
            .account_repo
            .blocks_domain(recipient_account_id, &actor.domain)
            .await?
        {
            return Ok(());
        }

        self.notification_repo
            .create(
                &user.id,
                actor_account_id,
                event_type,
                post_id,
                in_reply_to_post_id,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fedipress_common::{ap_id_hash, domain_hash};
    use fedipress_db::entities::{account, block, domain_block, notification, user};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn external_account(id: &str, domain: &str) -> account::Model {
        let ap_id = format!("https://{domain}/users/{id}");
        account::Model {
            id: id.to_string(),
            uuid: Some(format!("uuid-{id}")),
            username: id.to_string(),
            name: None,
            bio: None,
            avatar_url: None,
            banner_image_url: None,
            url: None,
            ap_id: ap_id.clone(),
            ap_id_hash: ap_id_hash(&ap_id),
            ap_inbox_url: format!("{ap_id}/inbox"),
            ap_shared_inbox_url: None,
            ap_outbox_url: None,
            ap_followers_url: None,
            ap_following_url: None,
            ap_liked_url: None,
            ap_public_key: None,
            ap_private_key: None,
            domain: domain.to_string(),
            domain_hash: domain_hash(domain),
            created_at: Utc::now().into(),
            updated_at: None,
            deleted_at: None,
        }
    }

    fn projection(db: Arc<sea_orm::DatabaseConnection>) -> NotificationProjection {
        NotificationProjection::new(
            AccountRepository::new(Arc::clone(&db)),
            SiteRepository::new(Arc::clone(&db)),
            PostRepository::new(Arc::clone(&db)),
            NotificationRepository::new(db),
        )
    }

    fn like_event() -> DomainEvent {
        DomainEvent::PostLiked {
            post_id: "p1".to_string(),
            author_id: "a-author".to_string(),
            account_id: "a-liker".to_string(),
        }
    }

    fn author_user() -> user::Model {
        user::Model {
            id: "u1".to_string(),
            site_id: "s1".to_string(),
            account_id: "a-author".to_string(),
        }
    }

    #[tokio::test]
    async fn test_like_creates_notification_for_internal_author() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                // recipient user row
                .append_query_results([[author_user()]])
                // no account block
                .append_query_results([Vec::<block::Model>::new()])
                // actor account (for its domain)
                .append_query_results([[external_account("a-liker", "mastodon.example")]])
                // no domain block
                .append_query_results([Vec::<domain_block::Model>::new()])
                // notification insert + fetch-back
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[notification::Model {
                    id: "n1".to_string(),
                    user_id: "u1".to_string(),
                    account_id: "a-liker".to_string(),
                    event_type: NotificationEventType::Like,
                    post_id: Some("p1".to_string()),
                    in_reply_to_post_id: None,
                    read: false,
                    created_at: Utc::now().into(),
                }]])
                .into_connection(),
        );

        projection(db).handle_event(like_event()).await.unwrap();
    }

    #[tokio::test]
    async fn test_blocked_actor_produces_no_notification() {
        // The blocks lookup answers with an edge; any insert attempt
        // would fail the mock.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([[author_user()]])
                .append_query_results([[block::Model {
                    id: "b1".to_string(),
                    blocker_id: "a-author".to_string(),
                    blocked_id: "a-liker".to_string(),
                    created_at: Utc::now().into(),
                }]])
                .into_connection(),
        );

        projection(db).handle_event(like_event()).await.unwrap();
    }

    #[tokio::test]
    async fn test_external_recipient_produces_no_notification() {
        // No users-join row: the author is not a tenant user.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        projection(db).handle_event(like_event()).await.unwrap();
    }

    #[tokio::test]
    async fn test_reply_that_mentions_its_target_notifies_once() {
        use fedipress_db::entities::post::{PostAudience, PostType};

        let parent = fedipress_db::entities::post::Model {
            id: "p-parent".to_string(),
            uuid: "u-parent".to_string(),
            post_type: PostType::Article,
            audience: PostAudience::Public,
            author_id: "a-author".to_string(),
            title: Some("Hello".to_string()),
            excerpt: None,
            summary: None,
            content: None,
            url: None,
            image_url: None,
            published_at: Utc::now().into(),
            in_reply_to: None,
            thread_root: Some("p-parent".to_string()),
            like_count: 0,
            repost_count: 0,
            reply_count: 1,
            reading_time_minutes: 1,
            attachments: None,
            ap_id: "https://blog.example/.ghost/activitypub/article/u-parent".to_string(),
            ap_id_hash: ap_id_hash("https://blog.example/.ghost/activitypub/article/u-parent"),
            metadata: None,
            deleted_at: None,
        };

        // One reply notification; the mention of the same recipient is
        // deduplicated, so no second insert is mocked.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                // parent post
                .append_query_results([[parent]])
                // reply notify: recipient user row
                .append_query_results([[author_user()]])
                // no account block
                .append_query_results([Vec::<block::Model>::new()])
                // actor account
                .append_query_results([[external_account("a-replier", "mastodon.example")]])
                // no domain block
                .append_query_results([Vec::<domain_block::Model>::new()])
                // reply notification insert + fetch-back
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[notification::Model {
                    id: "n1".to_string(),
                    user_id: "u1".to_string(),
                    account_id: "a-replier".to_string(),
                    event_type: NotificationEventType::Reply,
                    post_id: Some("p-reply".to_string()),
                    in_reply_to_post_id: Some("p-parent".to_string()),
                    read: false,
                    created_at: Utc::now().into(),
                }]])
                .into_connection(),
        );

        projection(db)
            .handle_event(DomainEvent::PostCreated {
                post_id: "p-reply".to_string(),
                author_id: "a-replier".to_string(),
                post_type: PostType::Note,
                audience: PostAudience::Public,
                in_reply_to: Some("p-parent".to_string()),
                // Mentions the reply target as well.
                mentioned_account_ids: vec!["a-author".to_string()],
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_block_event_purges_notifications() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([[author_user()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 4,
                }])
                .into_connection(),
        );

        projection(db)
            .handle_event(DomainEvent::AccountBlocked {
                blocker_id: "a-author".to_string(),
                blocked_id: "a-liker".to_string(),
            })
            .await
            .unwrap();
    }
}
