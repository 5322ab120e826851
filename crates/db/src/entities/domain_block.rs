//! Domain block entity (blocker → remote domain).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "domain_blocks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub blocker_id: String,

    /// Blocked domain, lowercased.
    pub domain: String,

    /// Hex SHA-256 of the lowercased domain; matches
    /// `accounts.domain_hash`.
    pub domain_hash: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::BlockerId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Blocker,
}

impl ActiveModelBehavior for ActiveModel {}
