//! Post entity (an article or note authored by an account).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Post types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum PostType {
    #[sea_orm(num_value = 0)]
    Article,
    #[sea_orm(num_value = 1)]
    Note,
}

/// Post audiences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum PostAudience {
    #[sea_orm(num_value = 0)]
    Public,
    #[sea_orm(num_value = 1)]
    FollowersOnly,
    #[sea_orm(num_value = 2)]
    Direct,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub uuid: String,

    #[sea_orm(column_name = "type")]
    pub post_type: PostType,

    pub audience: PostAudience,

    pub author_id: String,

    /// Notes never carry a title.
    #[sea_orm(nullable)]
    pub title: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub excerpt: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,

    #[sea_orm(nullable)]
    pub url: Option<String>,

    #[sea_orm(nullable)]
    pub image_url: Option<String>,

    pub published_at: DateTimeWithTimeZone,

    /// Post this one replies to; opaque id, resolved on demand.
    #[sea_orm(nullable)]
    pub in_reply_to: Option<String>,

    /// Root of the reply thread; self for top-level posts.
    #[sea_orm(nullable)]
    pub thread_root: Option<String>,

    #[sea_orm(default_value = 0)]
    pub like_count: i32,

    #[sea_orm(default_value = 0)]
    pub repost_count: i32,

    #[sea_orm(default_value = 0)]
    pub reply_count: i32,

    #[sea_orm(default_value = 0)]
    pub reading_time_minutes: i32,

    /// Attachment list as JSON.
    #[sea_orm(column_type = "Json", nullable)]
    pub attachments: Option<Json>,

    /// Canonical object URL.
    pub ap_id: String,

    #[sea_orm(unique)]
    pub ap_id_hash: String,

    /// Originating-blog metadata (e.g. author list) as JSON.
    #[sea_orm(column_type = "Json", nullable)]
    pub metadata: Option<Json>,

    /// Soft-delete marker; deleted posts reject mutations.
    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AuthorId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
