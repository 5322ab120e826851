//! Site entity (one tenant per HTTP host).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sites")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Lowercased HTTP host this tenant answers for.
    #[sea_orm(unique)]
    pub host: String,

    /// Random 32-byte hex secret used to verify publish webhooks.
    pub webhook_secret: String,

    /// Correlation id of the originating blog installation.
    #[sea_orm(nullable)]
    pub ghost_uuid: Option<String>,

    /// Disabled tenants answer 403 on every federated endpoint.
    #[sea_orm(default_value = false)]
    pub disabled: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::user::Entity")]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
