//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum NotificationEventType {
    #[sea_orm(num_value = 1)]
    Like,
    #[sea_orm(num_value = 2)]
    Repost,
    #[sea_orm(num_value = 3)]
    Reply,
    #[sea_orm(num_value = 4)]
    Follow,
    #[sea_orm(num_value = 5)]
    Mention,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user receiving the notification.
    pub user_id: String,

    /// The account that triggered it.
    pub account_id: String,

    pub event_type: NotificationEventType,

    /// Related post (like, repost, reply, mention).
    #[sea_orm(nullable)]
    pub post_id: Option<String>,

    /// The replied-to post, for reply notifications.
    #[sea_orm(nullable)]
    pub in_reply_to_post_id: Option<String>,

    #[sea_orm(default_value = false)]
    pub read: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Account,
}

impl ActiveModelBehavior for ActiveModel {}
