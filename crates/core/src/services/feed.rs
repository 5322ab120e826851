//! Feed projection.
//!
//! Derives per-user feed rows from post lifecycle events. A public
//! post produces one row for the author plus one per follower; a
//! followers-only post mirrors that fan-out; direct posts produce no
//! feed rows. Projection failures are logged by the bus and never
//! fail the primary write.

use fedipress_common::AppResult;
use fedipress_db::domain::DomainEvent;
use fedipress_db::entities::post::PostAudience;
use fedipress_db::repositories::{AccountRepository, FeedRepository, PostRepository, SiteRepository};
use tracing::debug;

/// Feed projection subscriber.
#[derive(Clone)]
pub struct FeedProjection {
    post_repo: PostRepository,
    account_repo: AccountRepository,
    site_repo: SiteRepository,
    feed_repo: FeedRepository,
}

impl FeedProjection {
    /// Create a new feed projection.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        account_repo: AccountRepository,
        site_repo: SiteRepository,
        feed_repo: FeedRepository,
    ) -> Self {
        Self {
            post_repo,
            account_repo,
            site_repo,
            feed_repo,
        }
    }

    /// Handle one domain event.
    pub async fn handle_event(&self, event: DomainEvent) -> AppResult<()> {
        match event {
            DomainEvent::PostCreated {
                post_id, author_id, ..
            } => self.project_created(&post_id, &author_id).await,
            DomainEvent::PostDeleted { post_id, .. } => {
                self.feed_repo.remove_post(&post_id).await?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn project_created(&self, post_id: &str, author_id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(post_id).await?;
        if post.audience == PostAudience::Direct {
            return Ok(());
        }

        let published_at = post.published_at.to_utc();

        // The author's own timeline, when the author is a tenant user.
        if let Some(user) = self.site_repo.find_user_by_account(author_id).await? {
            self.feed_repo
                .insert(
                    &user.id,
                    post_id,
                    author_id,
                    post.post_type,
                    post.audience,
                    published_at,
                )
                .await?;
        }

        // One row per follower that is a tenant user.
        let follower_users = self.account_repo.follower_user_ids(author_id).await?;
        debug!(
            post_id = %post_id,
            followers = follower_users.len(),
            "Fanning out feed rows"
        );
        for user_id in follower_users {
            self.feed_repo
                .insert(
                    &user_id,
                    post_id,
                    author_id,
                    post.post_type,
                    post.audience,
                    published_at,
                )
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fedipress_common::ap_id_hash;
    use fedipress_db::entities::post::{PostAudience, PostType};
    use fedipress_db::entities::{feed, follow, post, user};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn public_article(id: &str, author: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            uuid: "u1".to_string(),
            post_type: PostType::Article,
            audience: PostAudience::Public,
            author_id: author.to_string(),
            title: Some("Hello".to_string()),
            excerpt: None,
            summary: None,
            content: None,
            url: None,
            image_url: None,
            published_at: Utc::now().into(),
            in_reply_to: None,
            thread_root: Some(id.to_string()),
            like_count: 0,
            repost_count: 0,
            reply_count: 0,
            reading_time_minutes: 1,
            attachments: None,
            ap_id: format!("https://blog.example/.ghost/activitypub/article/{id}"),
            ap_id_hash: ap_id_hash(&format!(
                "https://blog.example/.ghost/activitypub/article/{id}"
            )),
            metadata: None,
            deleted_at: None,
        }
    }

    fn feed_row(id: &str, user_id: &str, post_id: &str) -> feed::Model {
        feed::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            author_id: "a1".to_string(),
            post_type: PostType::Article,
            audience: PostAudience::Public,
            published_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_public_post_fans_out_to_author_and_followers() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                // load post
                .append_query_results([[public_article("p1", "a1")]])
                // author's user row
                .append_query_results([[user::Model {
                    id: "u-author".to_string(),
                    site_id: "s1".to_string(),
                    account_id: "a1".to_string(),
                }]])
                // author feed row: exists check (absent) + insert
                .append_query_results([Vec::<feed::Model>::new()])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[feed_row("fe1", "u-author", "p1")]])
                // follower edges
                .append_query_results([[follow::Model {
                    id: "f1".to_string(),
                    follower_id: "a2".to_string(),
                    following_id: "a1".to_string(),
                    created_at: Utc::now().into(),
                }]])
                // follower user rows
                .append_query_results([[user::Model {
                    id: "u-follower".to_string(),
                    site_id: "s2".to_string(),
                    account_id: "a2".to_string(),
                }]])
                // follower feed row: exists check (absent) + insert
                .append_query_results([Vec::<feed::Model>::new()])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[feed_row("fe2", "u-follower", "p1")]])
                .into_connection(),
        );

        let projection = FeedProjection::new(
            PostRepository::new(Arc::clone(&db)),
            AccountRepository::new(Arc::clone(&db)),
            SiteRepository::new(Arc::clone(&db)),
            FeedRepository::new(db),
        );

        projection
            .handle_event(DomainEvent::PostCreated {
                post_id: "p1".to_string(),
                author_id: "a1".to_string(),
                post_type: PostType::Article,
                audience: PostAudience::Public,
                in_reply_to: None,
                mentioned_account_ids: vec![],
            })
            .await
            .unwrap();
        // All mocked responses consumed: author row + one follower row.
    }

    #[tokio::test]
    async fn test_direct_post_produces_no_feed_rows() {
        let mut post = public_article("p1", "a1");
        post.audience = PostAudience::Direct;

        // Only the post load is mocked: any further query would fail.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([[post]])
                .into_connection(),
        );

        let projection = FeedProjection::new(
            PostRepository::new(Arc::clone(&db)),
            AccountRepository::new(Arc::clone(&db)),
            SiteRepository::new(Arc::clone(&db)),
            FeedRepository::new(db),
        );

        projection
            .handle_event(DomainEvent::PostCreated {
                post_id: "p1".to_string(),
                author_id: "a1".to_string(),
                post_type: PostType::Article,
                audience: PostAudience::Direct,
                in_reply_to: None,
                mentioned_account_ids: vec![],
            })
            .await
            .unwrap();
    }
}
