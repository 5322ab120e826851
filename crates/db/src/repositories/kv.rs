//! Key-value repository (content-addressed `ActivityStreams` store).

use std::sync::Arc;

use chrono::Utc;
use fedipress_common::{AppError, AppResult};
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use serde_json::Value;

use crate::entities::{key_value, KeyValue};

/// Key-value repository for database operations.
///
/// Writes are last-writer-wins; activities are content-addressed by
/// canonical id, so concurrent single-key writes converge.
#[derive(Clone)]
pub struct KvRepository {
    db: Arc<DatabaseConnection>,
}

impl KvRepository {
    /// Create a new key-value repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get a value by key.
    pub async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        Self::get_on(self.db.as_ref(), key).await
    }

    /// Get a value by key on an arbitrary connection or transaction.
    pub async fn get_on<C: ConnectionTrait>(conn: &C, key: &str) -> AppResult<Option<Value>> {
        Ok(KeyValue::find()
            .filter(key_value::Column::KvKey.eq(key))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .map(|m| m.value))
    }

    /// Upsert a value.
    pub async fn set(&self, key: &str, value: Value) -> AppResult<()> {
        Self::set_on(self.db.as_ref(), key, value).await
    }

    /// Upsert a value on an arbitrary connection or transaction.
    pub async fn set_on<C: ConnectionTrait>(conn: &C, key: &str, value: Value) -> AppResult<()> {
        let model = key_value::ActiveModel {
            kv_key: Set(key.to_string()),
            value: Set(value),
            updated_at: Set(Utc::now().into()),
        };

        KeyValue::insert(model)
            .on_conflict(
                OnConflict::column(key_value::Column::KvKey)
                    .update_columns([key_value::Column::Value, key_value::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a key.
    pub async fn delete(&self, key: &str) -> AppResult<()> {
        KeyValue::delete_many()
            .filter(key_value::Column::KvKey.eq(key))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Prepend an item to the JSON list stored at `key`.
    ///
    /// Lists hold canonical ids (inbox/outbox membership); newest
    /// first. Duplicate ids are ignored, which makes replayed
    /// deliveries converge.
    pub async fn prepend_to_list<C: ConnectionTrait>(
        conn: &C,
        key: &str,
        item: &str,
    ) -> AppResult<()> {
        let mut list = Self::get_list_on(conn, key).await?;
        if list.iter().any(|existing| existing == item) {
            return Ok(());
        }
        list.insert(0, item.to_string());
        Self::set_on(conn, key, Value::from(list)).await
    }

    /// Remove an item from the JSON list stored at `key`.
    pub async fn remove_from_list<C: ConnectionTrait>(
        conn: &C,
        key: &str,
        item: &str,
    ) -> AppResult<()> {
        let mut list = Self::get_list_on(conn, key).await?;
        let before = list.len();
        list.retain(|existing| existing != item);
        if list.len() == before {
            return Ok(());
        }
        Self::set_on(conn, key, Value::from(list)).await
    }

    /// Read the JSON list stored at `key` (empty when absent).
    pub async fn get_list(&self, key: &str) -> AppResult<Vec<String>> {
        Self::get_list_on(self.db.as_ref(), key).await
    }

    /// Read the JSON list stored at `key` on an arbitrary connection.
    pub async fn get_list_on<C: ConnectionTrait>(conn: &C, key: &str) -> AppResult<Vec<String>> {
        let Some(value) = Self::get_on(conn, key).await? else {
            return Ok(Vec::new());
        };
        let Value::Array(items) = value else {
            return Err(AppError::Internal(format!("kv key {key} is not a list")));
        };
        Ok(items
            .into_iter()
            .filter_map(|v| v.as_str().map(std::string::ToString::to_string))
            .collect())
    }
}
