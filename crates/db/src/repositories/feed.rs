//! Feed repository.

use std::sync::Arc;

use fedipress_common::{id, AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::{
    feed,
    post::{PostAudience, PostType},
    Feed,
};

/// Feed repository for database operations.
#[derive(Clone)]
pub struct FeedRepository {
    db: Arc<DatabaseConnection>,
}

impl FeedRepository {
    /// Create a new feed repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a feed row; duplicate (user, post) pairs are skipped.
    pub async fn insert(
        &self,
        user_id: &str,
        post_id: &str,
        author_id: &str,
        post_type: PostType,
        audience: PostAudience,
        published_at: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<bool> {
        let exists = Feed::find()
            .filter(feed::Column::UserId.eq(user_id))
            .filter(feed::Column::PostId.eq(post_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_some();
        if exists {
            return Ok(false);
        }

        feed::ActiveModel {
            id: Set(id::row_id()),
            user_id: Set(user_id.to_string()),
            post_id: Set(post_id.to_string()),
            author_id: Set(author_id.to_string()),
            post_type: Set(post_type),
            audience: Set(audience),
            published_at: Set(published_at.into()),
        }
        .insert(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    /// List a user's feed, newest first.
    pub async fn find_for_user(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<feed::Model>> {
        Feed::find()
            .filter(feed::Column::UserId.eq(user_id))
            .order_by_desc(feed::Column::PublishedAt)
            .order_by_desc(feed::Column::PostId)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Remove every row referencing a post (post deletion).
    pub async fn remove_post(&self, post_id: &str) -> AppResult<u64> {
        let result = Feed::delete_many()
            .filter(feed::Column::PostId.eq(post_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}
