//! Key-value entity (content-addressed `ActivityStreams` object store).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "key_value")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub kv_key: String,

    #[sea_orm(column_type = "Json")]
    pub value: Json,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
