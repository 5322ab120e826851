//! Ghost↔AP post mapping repository.

use std::sync::Arc;

use fedipress_common::{ap_id_hash, id, AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::entities::{ghost_ap_post_mapping, GhostApPostMapping};

/// Repository for the idempotent blog-uuid → federated-id mapping.
#[derive(Clone)]
pub struct GhostMappingRepository {
    db: Arc<DatabaseConnection>,
}

impl GhostMappingRepository {
    /// Create a new mapping repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a mapping by blog post uuid.
    pub async fn find_by_ghost_uuid(
        &self,
        ghost_uuid: &str,
    ) -> AppResult<Option<ghost_ap_post_mapping::Model>> {
        GhostApPostMapping::find()
            .filter(ghost_ap_post_mapping::Column::GhostUuid.eq(ghost_uuid))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a mapping.
    ///
    /// The unique `ghost_uuid` column makes this the idempotency
    /// barrier for webhook publishing: a duplicate insert surfaces as
    /// a conflict.
    pub async fn insert(
        &self,
        ghost_uuid: &str,
        ap_id: &str,
    ) -> AppResult<ghost_ap_post_mapping::Model> {
        if self.find_by_ghost_uuid(ghost_uuid).await?.is_some() {
            return Err(AppError::Conflict("post-already-exists".to_string()));
        }
        ghost_ap_post_mapping::ActiveModel {
            id: Set(id::row_id()),
            ghost_uuid: Set(ghost_uuid.to_string()),
            ap_id: Set(ap_id.to_string()),
            ap_id_hash: Set(ap_id_hash(ap_id)),
        }
        .insert(self.db.as_ref())
        .await
        .map_err(|e| {
            // A racing insert hits the unique index instead.
            if e.to_string().to_lowercase().contains("duplicate") {
                AppError::Conflict("post-already-exists".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn mapping(uuid: &str) -> ghost_ap_post_mapping::Model {
        let ap_id = format!("https://blog.example/.ghost/activitypub/article/{uuid}");
        ghost_ap_post_mapping::Model {
            id: "m1".to_string(),
            ghost_uuid: uuid.to_string(),
            ap_id: ap_id.clone(),
            ap_id_hash: ap_id_hash(&ap_id),
        }
    }

    #[tokio::test]
    async fn test_insert_conflicts_on_existing_uuid() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([[mapping("u1")]])
                .into_connection(),
        );

        let repo = GhostMappingRepository::new(db);
        let result = repo.insert("u1", "https://blog.example/x").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
