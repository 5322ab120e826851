//! Notification repository.

use std::sync::Arc;

use chrono::Utc;
use fedipress_common::{id, AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::{
    notification::{self, NotificationEventType},
    Notification,
};

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a notification row.
    pub async fn create(
        &self,
        user_id: &str,
        account_id: &str,
        event_type: NotificationEventType,
        post_id: Option<String>,
        in_reply_to_post_id: Option<String>,
    ) -> AppResult<notification::Model> {
        notification::ActiveModel {
            id: Set(id::row_id()),
            user_id: Set(user_id.to_string()),
            account_id: Set(account_id.to_string()),
            event_type: Set(event_type),
            post_id: Set(post_id),
            in_reply_to_post_id: Set(in_reply_to_post_id),
            read: Set(false),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List notifications for a user, newest first.
    pub async fn find_for_user(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<notification::Model>> {
        Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Remove every notification a given account caused for a user.
    ///
    /// Invoked when the user's account blocks that sender.
    pub async fn purge_from_account(&self, user_id: &str, account_id: &str) -> AppResult<u64> {
        let result = Notification::delete_many()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::AccountId.eq(account_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Mark a notification read.
    pub async fn mark_read(&self, id: &str) -> AppResult<()> {
        Notification::update_many()
            .col_expr(notification::Column::Read, sea_orm::sea_query::Expr::value(true))
            .filter(notification::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
