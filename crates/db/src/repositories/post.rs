//! Post repository.
//!
//! Inserts assign the row id back into the aggregate; updates are
//! partial, driven by the aggregate's dirty flags. Like/repost edges
//! and their counters move in the same transaction, and lifecycle
//! events are published after commit.

use std::sync::Arc;

use chrono::Utc;
use fedipress_common::{ap_id_hash, id, AppError, AppResult};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Set, TransactionTrait,
};

use crate::domain::{DomainEvent, EventSink, PostAggregate};
use crate::entities::{
    mention, post, post_like, repost, Mention, Post, PostLike, Repost,
};

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
    events: Option<Arc<dyn EventSink>>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db, events: None }
    }

    /// Create a new post repository that publishes committed events.
    #[must_use]
    pub fn with_events(db: Arc<DatabaseConnection>, events: Arc<dyn EventSink>) -> Self {
        Self {
            db,
            events: Some(events),
        }
    }

    /// Find a post by id.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by id, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Find a post by its canonical object URL (case-folded).
    pub async fn find_by_ap_id(&self, ap_id: &str) -> AppResult<Option<post::Model>> {
        Post::find()
            .filter(post::Column::ApIdHash.eq(ap_id_hash(ap_id)))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Persist an aggregate.
    ///
    /// New aggregates are inserted (and receive their id); loaded ones
    /// get a partial UPDATE of the dirty columns only.
    pub async fn save(&self, aggregate: &mut PostAggregate) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if aggregate.is_new() {
            self.insert_new(&txn, aggregate).await?;
        } else {
            self.update_dirty(&txn, aggregate).await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(sink) = &self.events {
            for event in aggregate.pull_events() {
                sink.publish(event).await;
            }
        } else {
            aggregate.pull_events();
        }

        Ok(())
    }

    async fn insert_new(
        &self,
        txn: &DatabaseTransaction,
        aggregate: &mut PostAggregate,
    ) -> AppResult<()> {
        aggregate.mark_persisted(id::row_id());
        let model = aggregate.model.clone();

        post::ActiveModel {
            id: Set(model.id.clone()),
            uuid: Set(model.uuid),
            post_type: Set(model.post_type),
            audience: Set(model.audience),
            author_id: Set(model.author_id),
            title: Set(model.title),
            excerpt: Set(model.excerpt),
            summary: Set(model.summary),
            content: Set(model.content),
            url: Set(model.url),
            image_url: Set(model.image_url),
            published_at: Set(model.published_at),
            in_reply_to: Set(model.in_reply_to.clone()),
            thread_root: Set(model.thread_root),
            like_count: Set(0),
            repost_count: Set(0),
            reply_count: Set(0),
            reading_time_minutes: Set(model.reading_time_minutes),
            attachments: Set(model.attachments),
            ap_id: Set(model.ap_id),
            ap_id_hash: Set(model.ap_id_hash),
            metadata: Set(model.metadata),
            deleted_at: Set(None),
        }
        .insert(txn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        for account_id in &aggregate.mentioned_account_ids {
            mention::ActiveModel {
                id: Set(id::row_id()),
                post_id: Set(model.id.clone()),
                account_id: Set(account_id.clone()),
            }
            .insert(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        }

        // A reply bumps its parent's counter in the same transaction.
        if let Some(parent_id) = &model.in_reply_to {
            Post::update_many()
                .col_expr(
                    post::Column::ReplyCount,
                    Expr::col(post::Column::ReplyCount).add(1),
                )
                .filter(post::Column::Id.eq(parent_id.clone()))
                .exec(txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        Ok(())
    }

    async fn update_dirty(
        &self,
        txn: &DatabaseTransaction,
        aggregate: &PostAggregate,
    ) -> AppResult<()> {
        let changes = aggregate.changes();
        if !changes.any() {
            return Ok(());
        }
        let model = &aggregate.model;

        let mut update = Post::update_many().filter(post::Column::Id.eq(model.id.clone()));
        if changes.title {
            update = update.col_expr(post::Column::Title, Expr::value(model.title.clone()));
        }
        if changes.excerpt {
            update = update.col_expr(post::Column::Excerpt, Expr::value(model.excerpt.clone()));
        }
        if changes.summary {
            update = update.col_expr(post::Column::Summary, Expr::value(model.summary.clone()));
        }
        if changes.content {
            update = update.col_expr(post::Column::Content, Expr::value(model.content.clone()));
        }
        if changes.url {
            update = update.col_expr(post::Column::Url, Expr::value(model.url.clone()));
        }
        if changes.image_url {
            update = update.col_expr(post::Column::ImageUrl, Expr::value(model.image_url.clone()));
        }
        if changes.audience {
            update = update.col_expr(post::Column::Audience, Expr::value(model.audience));
        }
        if changes.deleted_at {
            update = update.col_expr(post::Column::DeletedAt, Expr::value(model.deleted_at));
        }

        let result = update
            .exec(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if result.rows_affected == 0 {
            return Err(AppError::PostNotFound(model.id.clone()));
        }
        Ok(())
    }

    /// Record a like edge and bump the counter, idempotently.
    ///
    /// Returns `false` (and changes nothing) when the edge already
    /// exists, so replayed activities converge.
    pub async fn add_like(&self, post_id: &str, account_id: &str) -> AppResult<bool> {
        let post = self.get_by_id(post_id).await?;
        let inserted = self
            .edge_insert(
                post_id,
                account_id,
                EdgeKind::Like,
            )
            .await?;
        if inserted {
            self.publish(DomainEvent::PostLiked {
                post_id: post_id.to_string(),
                author_id: post.author_id,
                account_id: account_id.to_string(),
            })
            .await;
        }
        Ok(inserted)
    }

    /// Remove a like edge and decrement the counter; no-op when absent.
    pub async fn remove_like(&self, post_id: &str, account_id: &str) -> AppResult<bool> {
        let post = self.get_by_id(post_id).await?;
        let removed = self
            .edge_remove(post_id, account_id, EdgeKind::Like)
            .await?;
        if removed {
            self.publish(DomainEvent::PostDisliked {
                post_id: post_id.to_string(),
                author_id: post.author_id,
                account_id: account_id.to_string(),
            })
            .await;
        }
        Ok(removed)
    }

    /// Record a repost edge and bump the counter, idempotently.
    pub async fn add_repost(&self, post_id: &str, account_id: &str) -> AppResult<bool> {
        let post = self.get_by_id(post_id).await?;
        let inserted = self
            .edge_insert(post_id, account_id, EdgeKind::Repost)
            .await?;
        if inserted {
            self.publish(DomainEvent::PostReposted {
                post_id: post_id.to_string(),
                author_id: post.author_id,
                account_id: account_id.to_string(),
            })
            .await;
        }
        Ok(inserted)
    }

    /// Remove a repost edge and decrement the counter; no-op when absent.
    pub async fn remove_repost(&self, post_id: &str, account_id: &str) -> AppResult<bool> {
        let post = self.get_by_id(post_id).await?;
        let removed = self
            .edge_remove(post_id, account_id, EdgeKind::Repost)
            .await?;
        if removed {
            self.publish(DomainEvent::PostDereposted {
                post_id: post_id.to_string(),
                author_id: post.author_id,
                account_id: account_id.to_string(),
            })
            .await;
        }
        Ok(removed)
    }

    async fn edge_insert(
        &self,
        post_id: &str,
        account_id: &str,
        kind: EdgeKind,
    ) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let exists = match kind {
            EdgeKind::Like => PostLike::find()
                .filter(post_like::Column::PostId.eq(post_id))
                .filter(post_like::Column::AccountId.eq(account_id))
                .one(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
                .is_some(),
            EdgeKind::Repost => Repost::find()
                .filter(repost::Column::PostId.eq(post_id))
                .filter(repost::Column::AccountId.eq(account_id))
                .one(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
                .is_some(),
        };
        if exists {
            txn.commit()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(false);
        }

        match kind {
            EdgeKind::Like => {
                post_like::ActiveModel {
                    id: Set(id::row_id()),
                    post_id: Set(post_id.to_string()),
                    account_id: Set(account_id.to_string()),
                    created_at: Set(Utc::now().into()),
                }
                .insert(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            }
            EdgeKind::Repost => {
                repost::ActiveModel {
                    id: Set(id::row_id()),
                    post_id: Set(post_id.to_string()),
                    account_id: Set(account_id.to_string()),
                    created_at: Set(Utc::now().into()),
                }
                .insert(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            }
        }

        Post::update_many()
            .col_expr(kind.counter_column(), Expr::col(kind.counter_column()).add(1))
            .filter(post::Column::Id.eq(post_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    async fn edge_remove(
        &self,
        post_id: &str,
        account_id: &str,
        kind: EdgeKind,
    ) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let deleted = match kind {
            EdgeKind::Like => PostLike::delete_many()
                .filter(post_like::Column::PostId.eq(post_id))
                .filter(post_like::Column::AccountId.eq(account_id))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
                .rows_affected,
            EdgeKind::Repost => Repost::delete_many()
                .filter(repost::Column::PostId.eq(post_id))
                .filter(repost::Column::AccountId.eq(account_id))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
                .rows_affected,
        };
        if deleted == 0 {
            txn.commit()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(false);
        }

        // Never go below zero even if a replay slipped through.
        Post::update_many()
            .col_expr(
                kind.counter_column(),
                Expr::cust(kind.decrement_expression()),
            )
            .filter(post::Column::Id.eq(post_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    async fn publish(&self, event: DomainEvent) {
        if let Some(sink) = &self.events {
            sink.publish(event).await;
        }
    }

    /// Public, non-deleted posts by an author, newest first.
    pub async fn find_public_by_author(
        &self,
        author_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<post::Model>> {
        Post::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .filter(post::Column::Audience.eq(post::PostAudience::Public))
            .filter(post::Column::DeletedAt.is_null())
            .order_by_desc(post::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count public, non-deleted posts by an author.
    pub async fn count_public_by_author(&self, author_id: &str) -> AppResult<u64> {
        Post::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .filter(post::Column::Audience.eq(post::PostAudience::Public))
            .filter(post::Column::DeletedAt.is_null())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Posts liked by an account, newest like first (liked collection).
    pub async fn find_liked_by(
        &self,
        account_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<post::Model>> {
        Post::find()
            .join_rev(JoinType::InnerJoin, post_like::Relation::Post.def())
            .filter(post_like::Column::AccountId.eq(account_id))
            .filter(post::Column::DeletedAt.is_null())
            .order_by_desc(post::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count posts liked by an account.
    pub async fn count_liked_by(&self, account_id: &str) -> AppResult<u64> {
        PostLike::find()
            .filter(post_like::Column::AccountId.eq(account_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether an account has liked a post.
    pub async fn has_liked(&self, post_id: &str, account_id: &str) -> AppResult<bool> {
        Ok(PostLike::find()
            .filter(post_like::Column::PostId.eq(post_id))
            .filter(post_like::Column::AccountId.eq(account_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_some())
    }

    /// All posts in a thread, oldest first.
    pub async fn find_thread(&self, root_id: &str) -> AppResult<Vec<post::Model>> {
        Post::find()
            .filter(post::Column::ThreadRoot.eq(root_id))
            .filter(post::Column::DeletedAt.is_null())
            .order_by_asc(post::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mentioned account ids for a post.
    pub async fn mentioned_accounts(&self, post_id: &str) -> AppResult<Vec<String>> {
        Ok(Mention::find()
            .filter(mention::Column::PostId.eq(post_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .into_iter()
            .map(|m| m.account_id)
            .collect())
    }
}

#[derive(Clone, Copy)]
enum EdgeKind {
    Like,
    Repost,
}

impl EdgeKind {
    const fn counter_column(self) -> post::Column {
        match self {
            Self::Like => post::Column::LikeCount,
            Self::Repost => post::Column::RepostCount,
        }
    }

    const fn decrement_expression(self) -> &'static str {
        match self {
            Self::Like => "GREATEST(like_count - 1, 0)",
            Self::Repost => "GREATEST(repost_count - 1, 0)",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::post::{PostAudience, PostType};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn test_post(id: &str, author: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            uuid: "11111111-1111-1111-1111-111111111111".to_string(),
            post_type: PostType::Article,
            audience: PostAudience::Public,
            author_id: author.to_string(),
            title: Some("Hello".to_string()),
            excerpt: None,
            summary: None,
            content: Some("<p>hi</p>".to_string()),
            url: Some("https://blog.example/hello/".to_string()),
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

    #[tokio::test]
    async fn test_find_by_ap_id() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([[test_post("p1", "a1")]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let post = repo
            .find_by_ap_id("https://blog.example/.ghost/activitypub/article/p1")
            .await
            .unwrap();
        assert!(post.is_some());
    }

    #[tokio::test]
    async fn test_add_like_inserts_edge_and_counter() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                // get_by_id
                .append_query_results([[test_post("p1", "a1")]])
                // edge existence check: absent
                .append_query_results([Vec::<post_like::Model>::new()])
                // edge insert + fetch-back
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[post_like::Model {
                    id: "l1".to_string(),
                    post_id: "p1".to_string(),
                    account_id: "a2".to_string(),
                    created_at: Utc::now().into(),
                }]])
                // counter update
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        assert!(repo.add_like("p1", "a2").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_like_is_idempotent() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([[test_post("p1", "a1")]])
                .append_query_results([[post_like::Model {
                    id: "l1".to_string(),
                    post_id: "p1".to_string(),
                    account_id: "a2".to_string(),
                    created_at: Utc::now().into(),
                }]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        // Edge already present: nothing inserted, counter untouched.
        assert!(!repo.add_like("p1", "a2").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_like_absent_edge_is_noop() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([[test_post("p1", "a1")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        assert!(!repo.remove_like("p1", "a2").await.unwrap());
    }
}
