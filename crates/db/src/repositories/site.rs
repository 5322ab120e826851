//! Site repository.

use std::sync::Arc;

use fedipress_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter,
};

use crate::entities::{site, user, Site, User};

/// Site repository for database operations.
#[derive(Clone)]
pub struct SiteRepository {
    db: Arc<DatabaseConnection>,
}

impl SiteRepository {
    /// Create a new site repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Access to the underlying connection (for cross-repo transactions).
    #[must_use]
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.db)
    }

    /// Find a site by host (always matched lowercased).
    pub async fn find_by_host(&self, host: &str) -> AppResult<Option<site::Model>> {
        Site::find()
            .filter(site::Column::Host.eq(host.to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a site by id.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<site::Model>> {
        Site::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the users-join row for a site.
    pub async fn find_user(&self, site_id: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::SiteId.eq(site_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the users-join row for an account.
    pub async fn find_user_by_account(&self, account_id: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::AccountId.eq(account_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Total number of tenant users (node info usage).
    pub async fn count_users(&self) -> AppResult<u64> {
        User::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a site row on an arbitrary connection or transaction.
    pub async fn insert_on<C: ConnectionTrait>(
        conn: &C,
        model: site::ActiveModel,
    ) -> AppResult<site::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a users-join row on an arbitrary connection or transaction.
    pub async fn insert_user_on<C: ConnectionTrait>(
        conn: &C,
        model: user::ActiveModel,
    ) -> AppResult<user::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_site(id: &str, host: &str) -> site::Model {
        site::Model {
            id: id.to_string(),
            host: host.to_string(),
            webhook_secret: "00".repeat(32),
            ghost_uuid: None,
            disabled: false,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_host_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([[test_site("s1", "blog.example")]])
                .into_connection(),
        );

        let repo = SiteRepository::new(db);
        let site = repo.find_by_host("Blog.Example").await.unwrap();

        assert!(site.is_some());
        assert_eq!(site.unwrap().host, "blog.example");
    }

    #[tokio::test]
    async fn test_find_by_host_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([Vec::<site::Model>::new()])
                .into_connection(),
        );

        let repo = SiteRepository::new(db);
        assert!(repo.find_by_host("missing.example").await.unwrap().is_none());
    }
}
