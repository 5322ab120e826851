//! Delivery backoff entity (per-inbox permanent-failure accounting).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery_backoffs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Target inbox URL.
    pub inbox_url: String,

    /// Hex SHA-256 of the inbox URL; URLs exceed index key limits.
    #[sea_orm(unique)]
    pub inbox_url_hash: String,

    /// Consecutive permanent failures recorded against this inbox.
    pub failure_count: i32,

    /// Deliveries to this inbox are dropped until this instant.
    pub backoff_until: DateTimeWithTimeZone,

    #[sea_orm(column_type = "Text", nullable)]
    pub last_error: Option<String>,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
