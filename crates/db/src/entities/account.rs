//! Account entity (an `ActivityPub` actor, internal or external).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Stable public identifier. Lazily backfilled on first read for
    /// rows created before the column existed.
    #[sea_orm(nullable)]
    pub uuid: Option<String>,

    pub username: String,

    #[sea_orm(nullable)]
    pub name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,

    #[sea_orm(nullable)]
    pub avatar_url: Option<String>,

    #[sea_orm(nullable)]
    pub banner_image_url: Option<String>,

    /// Profile URL; defaults to `ap_id` when the actor document has none.
    #[sea_orm(nullable)]
    pub url: Option<String>,

    /// Canonical actor URL.
    pub ap_id: String,

    /// Hex SHA-256 of the lowercased `ap_id`; enforces case-folded
    /// uniqueness and is the only column `ap_id` lookups filter on.
    #[sea_orm(unique)]
    pub ap_id_hash: String,

    pub ap_inbox_url: String,

    #[sea_orm(nullable)]
    pub ap_shared_inbox_url: Option<String>,

    #[sea_orm(nullable)]
    pub ap_outbox_url: Option<String>,

    #[sea_orm(nullable)]
    pub ap_followers_url: Option<String>,

    #[sea_orm(nullable)]
    pub ap_following_url: Option<String>,

    #[sea_orm(nullable)]
    pub ap_liked_url: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub ap_public_key: Option<String>,

    /// PEM private key; internal accounts only.
    #[sea_orm(column_type = "Text", nullable)]
    pub ap_private_key: Option<String>,

    /// Host part of `ap_id`.
    pub domain: String,

    /// Hex SHA-256 of the lowercased domain; domain blocks match on it.
    pub domain_hash: String,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,

    /// Soft-delete marker (set by an inbound `Delete(Actor)`).
    #[sea_orm(nullable)]
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Posts,

    #[sea_orm(has_one = "super::user::Entity")]
    User,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
