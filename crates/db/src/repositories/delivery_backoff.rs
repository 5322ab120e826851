//! Delivery backoff repository.
//!
//! Permanent delivery failures accumulate an exponential per-inbox
//! backoff. While a record is active, the queue drops outbound
//! messages to that inbox before publishing; any successful delivery
//! clears the record.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use fedipress_common::{ap_id_hash, id, AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::entities::{delivery_backoff, DeliveryBackoff};

/// Backoff schedule for consecutive permanent failures, in seconds:
/// 1 min, 5 min, 30 min, 2 h, 12 h, capped at 24 h.
const BACKOFF_SCHEDULE_SECS: [i64; 6] = [60, 300, 1800, 7200, 43_200, 86_400];

/// Backoff duration for the given consecutive failure count (1-based).
#[must_use]
pub fn backoff_for_failure_count(failure_count: i32) -> Duration {
    let index = usize::try_from(failure_count.max(1) - 1).unwrap_or(0);
    let secs = BACKOFF_SCHEDULE_SECS
        .get(index)
        .copied()
        .unwrap_or(BACKOFF_SCHEDULE_SECS[BACKOFF_SCHEDULE_SECS.len() - 1]);
    Duration::seconds(secs)
}

/// Delivery backoff repository for database operations.
#[derive(Clone)]
pub struct DeliveryBackoffRepository {
    db: Arc<DatabaseConnection>,
}

impl DeliveryBackoffRepository {
    /// Create a new delivery backoff repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// The backoff record for an inbox iff it is still active
    /// (`backoff_until > now`).
    pub async fn get_active(&self, inbox_url: &str) -> AppResult<Option<delivery_backoff::Model>> {
        let record = self.find(inbox_url).await?;
        Ok(record.filter(|r| r.backoff_until > Utc::now()))
    }

    /// The backoff record for an inbox, active or not.
    pub async fn find(&self, inbox_url: &str) -> AppResult<Option<delivery_backoff::Model>> {
        DeliveryBackoff::find()
            .filter(delivery_backoff::Column::InboxUrlHash.eq(ap_id_hash(inbox_url)))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record a permanent failure, advancing the backoff schedule.
    pub async fn record_failure(
        &self,
        inbox_url: &str,
        error: &str,
    ) -> AppResult<delivery_backoff::Model> {
        let now = Utc::now();
        match self.find(inbox_url).await? {
            Some(existing) => {
                let failure_count = existing.failure_count + 1;
                let until: DateTime<Utc> = now + backoff_for_failure_count(failure_count);
                let mut model: delivery_backoff::ActiveModel = existing.into();
                model.failure_count = Set(failure_count);
                model.backoff_until = Set(until.into());
                model.last_error = Set(Some(error.to_string()));
                model.updated_at = Set(now.into());
                model
                    .update(self.db.as_ref())
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            }
            None => {
                let until: DateTime<Utc> = now + backoff_for_failure_count(1);
                delivery_backoff::ActiveModel {
                    id: Set(id::row_id()),
                    inbox_url: Set(inbox_url.to_string()),
                    inbox_url_hash: Set(ap_id_hash(inbox_url)),
                    failure_count: Set(1),
                    backoff_until: Set(until.into()),
                    last_error: Set(Some(error.to_string())),
                    updated_at: Set(now.into()),
                }
                .insert(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))
            }
        }
    }

    /// Clear the record for an inbox (successful delivery).
    pub async fn clear(&self, inbox_url: &str) -> AppResult<()> {
        DeliveryBackoff::delete_many()
            .filter(delivery_backoff::Column::InboxUrlHash.eq(ap_id_hash(inbox_url)))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn record(inbox: &str, failures: i32, until: DateTime<Utc>) -> delivery_backoff::Model {
        delivery_backoff::Model {
            id: "b1".to_string(),
            inbox_url: inbox.to_string(),
            inbox_url_hash: ap_id_hash(inbox),
            failure_count: failures,
            backoff_until: until.into(),
            last_error: Some("(403 Forbidden)".to_string()),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(backoff_for_failure_count(1), Duration::seconds(60));
        assert_eq!(backoff_for_failure_count(2), Duration::seconds(300));
        assert_eq!(backoff_for_failure_count(3), Duration::seconds(1800));
        assert_eq!(backoff_for_failure_count(4), Duration::seconds(7200));
        assert_eq!(backoff_for_failure_count(5), Duration::seconds(43_200));
        // Capped at 24 hours from the sixth failure on.
        assert_eq!(backoff_for_failure_count(6), Duration::seconds(86_400));
        assert_eq!(backoff_for_failure_count(40), Duration::seconds(86_400));
    }

    #[tokio::test]
    async fn test_get_active_filters_expired_records() {
        let inbox = "https://broken.example/inbox";
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([[record(inbox, 2, Utc::now() + Duration::minutes(5))]])
                .append_query_results([[record(inbox, 2, Utc::now() - Duration::minutes(5))]])
                .into_connection(),
        );

        let repo = DeliveryBackoffRepository::new(db);
        assert!(repo.get_active(inbox).await.unwrap().is_some());
        assert!(repo.get_active(inbox).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_failure_increments() {
        let inbox = "https://broken.example/inbox";
        let existing = record(inbox, 1, Utc::now());
        let mut updated = existing.clone();
        updated.failure_count = 2;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([[existing]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[updated]])
                .into_connection(),
        );

        let repo = DeliveryBackoffRepository::new(db);
        let saved = repo.record_failure(inbox, "(500)").await.unwrap();
        assert_eq!(saved.failure_count, 2);
    }
}
