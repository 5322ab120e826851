//! Mapping between blog post uuids and federated object ids.
//!
//! The unique `ghost_uuid` column is what makes webhook publishing
//! idempotent: a second webhook for the same post conflicts here.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ghost_ap_post_mappings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub ghost_uuid: String,

    /// Canonical id of the federated Article.
    pub ap_id: String,

    #[sea_orm(unique)]
    pub ap_id_hash: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
