//! Account repository.
//!
//! `save` is the single write path for an account's profile fields and
//! its follow/block edges: the aggregate's pulled events are applied
//! inside the same transaction as the row update, and published to the
//! event sink strictly after commit.

use std::sync::Arc;

use chrono::Utc;
use fedipress_common::{ap_id_hash, domain_hash, id, AppError, AppResult};
use sea_orm::{
    sea_query::{Condition, Expr, Query},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Set, TransactionTrait,
};

use crate::domain::{AccountAggregate, DomainEvent, EventSink};
use crate::entities::{
    account, block, domain_block, follow, user, Account, Block, DomainBlock, Follow, User,
};

/// Account repository for database operations.
#[derive(Clone)]
pub struct AccountRepository {
    db: Arc<DatabaseConnection>,
    events: Option<Arc<dyn EventSink>>,
}

impl AccountRepository {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            events: None,
        }
    }

    /// Create a new account repository that publishes committed events.
    #[must_use]
    pub fn with_events(db: Arc<DatabaseConnection>, events: Arc<dyn EventSink>) -> Self {
        Self {
            db,
            events: Some(events),
        }
    }

    /// Find an account by id.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<account::Model>> {
        let model = Account::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.backfill_uuid(model).await
    }

    /// Find an account by id, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<account::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    /// Find an account by its canonical actor URL.
    ///
    /// Lookups go through the hash column, so they are case-folded.
    pub async fn find_by_ap_id(&self, ap_id: &str) -> AppResult<Option<account::Model>> {
        let model = Account::find()
            .filter(account::Column::ApIdHash.eq(ap_id_hash(ap_id)))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.backfill_uuid(model).await
    }

    /// Get the default internal account bound to a site.
    pub async fn get_by_site(&self, site_id: &str) -> AppResult<account::Model> {
        let model = Account::find()
            .join(JoinType::InnerJoin, account::Relation::User.def())
            .filter(user::Column::SiteId.eq(site_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.backfill_uuid(model)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(format!("site {site_id}")))
    }

    /// Insert a new account row.
    pub async fn create(&self, model: account::ActiveModel) -> AppResult<account::Model> {
        Self::insert_on(self.db.as_ref(), model).await
    }

    /// Insert a new account row on an arbitrary connection or transaction.
    pub async fn insert_on<C: ConnectionTrait>(
        conn: &C,
        model: account::ActiveModel,
    ) -> AppResult<account::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Persist an aggregate: profile row update plus the side-effect of
    /// every pulled event, in one transaction.
    pub async fn save(&self, aggregate: &mut AccountAggregate) -> AppResult<()> {
        let events = aggregate.pull_events();
        let model = aggregate.model.clone();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let updated = Account::update_many()
            .col_expr(account::Column::Name, Expr::value(model.name.clone()))
            .col_expr(account::Column::Bio, Expr::value(model.bio.clone()))
            .col_expr(
                account::Column::Username,
                Expr::value(model.username.clone()),
            )
            .col_expr(
                account::Column::AvatarUrl,
                Expr::value(model.avatar_url.clone()),
            )
            .col_expr(
                account::Column::BannerImageUrl,
                Expr::value(model.banner_image_url.clone()),
            )
            .col_expr(
                account::Column::UpdatedAt,
                Expr::value(Some(chrono::DateTime::<chrono::FixedOffset>::from(
                    Utc::now(),
                ))),
            )
            .filter(account::Column::Id.eq(model.id.clone()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if updated.rows_affected == 0 {
            return Err(AppError::AccountNotFound(model.id));
        }

        for event in &events {
            self.apply_event(&txn, event).await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(sink) = &self.events {
            for event in events {
                sink.publish(event).await;
            }
        }

        Ok(())
    }

    /// Apply one event's side-effect inside the save transaction.
    async fn apply_event(&self, txn: &DatabaseTransaction, event: &DomainEvent) -> AppResult<()> {
        match event {
            DomainEvent::AccountFollowed {
                follower_id,
                following_id,
            } => {
                self.insert_follow_if_absent(txn, follower_id, following_id)
                    .await
            }
            DomainEvent::AccountUnfollowed {
                follower_id,
                following_id,
            } => {
                Follow::delete_many()
                    .filter(follow::Column::FollowerId.eq(follower_id))
                    .filter(follow::Column::FollowingId.eq(following_id))
                    .exec(txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            DomainEvent::AccountBlocked {
                blocker_id,
                blocked_id,
            } => {
                let exists = Block::find()
                    .filter(block::Column::BlockerId.eq(blocker_id))
                    .filter(block::Column::BlockedId.eq(blocked_id))
                    .one(txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?
                    .is_some();
                if !exists {
                    block::ActiveModel {
                        id: Set(id::row_id()),
                        blocker_id: Set(blocker_id.clone()),
                        blocked_id: Set(blocked_id.clone()),
                        created_at: Set(Utc::now().into()),
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                }

                // Sever follows in both directions.
                Follow::delete_many()
                    .filter(
                        Condition::any()
                            .add(
                                Condition::all()
                                    .add(follow::Column::FollowerId.eq(blocker_id))
                                    .add(follow::Column::FollowingId.eq(blocked_id)),
                            )
                            .add(
                                Condition::all()
                                    .add(follow::Column::FollowerId.eq(blocked_id))
                                    .add(follow::Column::FollowingId.eq(blocker_id)),
                            ),
                    )
                    .exec(txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            DomainEvent::AccountUnblocked {
                blocker_id,
                blocked_id,
            } => {
                Block::delete_many()
                    .filter(block::Column::BlockerId.eq(blocker_id))
                    .filter(block::Column::BlockedId.eq(blocked_id))
                    .exec(txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            DomainEvent::DomainBlocked { blocker_id, domain } => {
                let hash = domain_hash(domain);
                let exists = DomainBlock::find()
                    .filter(domain_block::Column::BlockerId.eq(blocker_id))
                    .filter(domain_block::Column::DomainHash.eq(hash.clone()))
                    .one(txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?
                    .is_some();
                if !exists {
                    domain_block::ActiveModel {
                        id: Set(id::row_id()),
                        blocker_id: Set(blocker_id.clone()),
                        domain: Set(domain.clone()),
                        domain_hash: Set(hash.clone()),
                        created_at: Set(Utc::now().into()),
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                }

                // Sever every follow whose counterparty lives on that domain.
                let domain_accounts = Query::select()
                    .column(account::Column::Id)
                    .from(Account)
                    .and_where(Expr::col(account::Column::DomainHash).eq(hash))
                    .to_owned();
                Follow::delete_many()
                    .filter(
                        Condition::any()
                            .add(
                                Condition::all()
                                    .add(follow::Column::FollowerId.eq(blocker_id))
                                    .add(
                                        follow::Column::FollowingId
                                            .in_subquery(domain_accounts.clone()),
                                    ),
                            )
                            .add(
                                Condition::all()
                                    .add(follow::Column::FollowingId.eq(blocker_id))
                                    .add(follow::Column::FollowerId.in_subquery(domain_accounts)),
                            ),
                    )
                    .exec(txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            DomainEvent::DomainUnblocked { blocker_id, domain } => {
                DomainBlock::delete_many()
                    .filter(domain_block::Column::BlockerId.eq(blocker_id))
                    .filter(domain_block::Column::DomainHash.eq(domain_hash(domain)))
                    .exec(txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            // Post lifecycle events are applied by the post repository.
            _ => Ok(()),
        }
    }

    async fn insert_follow_if_absent(
        &self,
        txn: &DatabaseTransaction,
        follower_id: &str,
        following_id: &str,
    ) -> AppResult<()> {
        // The unique pair index backstops concurrent inserts.
        let exists = Follow::find()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::FollowingId.eq(following_id))
            .one(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_some();
        if exists {
            return Ok(());
        }
        follow::ActiveModel {
            id: Set(id::row_id()),
            follower_id: Set(follower_id.to_string()),
            following_id: Set(following_id.to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(txn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Check whether `follower` follows `following`.
    pub async fn is_following(&self, follower_id: &str, following_id: &str) -> AppResult<bool> {
        Ok(Follow::find()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::FollowingId.eq(following_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_some())
    }

    /// Check whether `blocker` blocks `blocked`.
    pub async fn blocks(&self, blocker_id: &str, blocked_id: &str) -> AppResult<bool> {
        Ok(Block::find()
            .filter(block::Column::BlockerId.eq(blocker_id))
            .filter(block::Column::BlockedId.eq(blocked_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_some())
    }

    /// Check whether `blocker` blocks the given domain.
    pub async fn blocks_domain(&self, blocker_id: &str, domain: &str) -> AppResult<bool> {
        Ok(DomainBlock::find()
            .filter(domain_block::Column::BlockerId.eq(blocker_id))
            .filter(domain_block::Column::DomainHash.eq(domain_hash(domain)))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_some())
    }

    /// Followers of an account, newest follow first, account id
    /// descending on ties.
    pub async fn get_followers(
        &self,
        account_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<account::Model>> {
        let rows = Follow::find()
            .filter(follow::Column::FollowingId.eq(account_id))
            .order_by_desc(follow::Column::CreatedAt)
            .order_by_desc(follow::Column::FollowerId)
            .offset(offset)
            .limit(limit)
            .find_also_related(Account)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(rows.into_iter().filter_map(|(_, account)| account).collect())
    }

    /// Accounts an account follows, newest follow first.
    pub async fn get_following(
        &self,
        account_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<account::Model>> {
        let follows = Follow::find()
            .filter(follow::Column::FollowerId.eq(account_id))
            .order_by_desc(follow::Column::CreatedAt)
            .order_by_desc(follow::Column::FollowingId)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let ids: Vec<String> = follows.iter().map(|f| f.following_id.clone()).collect();
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let mut accounts = Account::find()
            .filter(account::Column::Id.is_in(ids.clone()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        // Restore follow ordering.
        accounts.sort_by_key(|a| ids.iter().position(|id| *id == a.id));
        Ok(accounts)
    }

    /// Count followers.
    pub async fn count_followers(&self, account_id: &str) -> AppResult<u64> {
        Follow::find()
            .filter(follow::Column::FollowingId.eq(account_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count followed accounts.
    pub async fn count_following(&self, account_id: &str) -> AppResult<u64> {
        Follow::find()
            .filter(follow::Column::FollowerId.eq(account_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Deduplicated delivery inboxes for every follower of an account,
    /// preferring shared inboxes.
    pub async fn follower_inboxes(&self, account_id: &str) -> AppResult<Vec<String>> {
        let followers = Follow::find()
            .filter(follow::Column::FollowingId.eq(account_id))
            .find_also_related(Account)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut inboxes = Vec::new();
        for (_, follower) in followers {
            let Some(follower) = follower else { continue };
            let inbox = follower
                .ap_shared_inbox_url
                .unwrap_or(follower.ap_inbox_url);
            if !inboxes.contains(&inbox) {
                inboxes.push(inbox);
            }
        }
        Ok(inboxes)
    }

    /// The user-row ids of every follower that is an internal account
    /// (feed fan-out targets).
    pub async fn follower_user_ids(&self, account_id: &str) -> AppResult<Vec<String>> {
        let follows = Follow::find()
            .filter(follow::Column::FollowingId.eq(account_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let follower_ids: Vec<String> = follows.into_iter().map(|f| f.follower_id).collect();
        if follower_ids.is_empty() {
            return Ok(vec![]);
        }
        let users = User::find()
            .filter(user::Column::AccountId.is_in(follower_ids))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.into_iter().map(|u| u.id).collect())
    }

    /// Soft-delete an account (inbound `Delete` of an actor).
    pub async fn soft_delete(&self, id: &str) -> AppResult<()> {
        Account::update_many()
            .col_expr(
                account::Column::DeletedAt,
                Expr::value(Some(chrono::DateTime::<chrono::FixedOffset>::from(
                    Utc::now(),
                ))),
            )
            .filter(account::Column::Id.eq(id))
            .filter(account::Column::DeletedAt.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Backfill a missing uuid on read.
    ///
    /// Two readers racing produce the same outcome: the update is
    /// guarded by `uuid IS NULL`, so the first writer wins and the
    /// loser rereads the committed value.
    async fn backfill_uuid(
        &self,
        model: Option<account::Model>,
    ) -> AppResult<Option<account::Model>> {
        let Some(mut model) = model else {
            return Ok(None);
        };
        if model.uuid.is_some() {
            return Ok(Some(model));
        }

        let fresh = id::public_uuid();
        let updated = Account::update_many()
            .col_expr(account::Column::Uuid, Expr::value(Some(fresh.clone())))
            .filter(account::Column::Id.eq(model.id.clone()))
            .filter(account::Column::Uuid.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if updated.rows_affected > 0 {
            model.uuid = Some(fresh);
            return Ok(Some(model));
        }
        // Lost the race; reread the winner's value.
        Account::find_by_id(model.id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn test_account(id: &str, uuid: Option<&str>) -> account::Model {
        account::Model {
            id: id.to_string(),
            uuid: uuid.map(std::string::ToString::to_string),
            username: "index".to_string(),
            name: Some("Test Blog".to_string()),
            bio: None,
            avatar_url: None,
            banner_image_url: None,
            url: None,
            ap_id: "https://blog.example/.ghost/activitypub/users/index".to_string(),
            ap_id_hash: ap_id_hash("https://blog.example/.ghost/activitypub/users/index"),
            ap_inbox_url: "https://blog.example/.ghost/activitypub/inbox/index".to_string(),
            ap_shared_inbox_url: None,
            ap_outbox_url: None,
            ap_followers_url: None,
            ap_following_url: None,
            ap_liked_url: None,
            ap_public_key: None,
            ap_private_key: None,
            domain: "blog.example".to_string(),
            domain_hash: domain_hash("blog.example"),
            created_at: Utc::now().into(),
            updated_at: None,
            deleted_at: None,
        }
    }

    fn test_follow(id: &str, follower: &str, following: &str) -> follow::Model {
        follow::Model {
            id: id.to_string(),
            follower_id: follower.to_string(),
            following_id: following.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([[test_account("a1", Some("u-1"))]])
                .into_connection(),
        );

        let repo = AccountRepository::new(db);
        let account = repo.find_by_id("a1").await.unwrap().unwrap();
        assert_eq!(account.id, "a1");
        assert_eq!(account.uuid.as_deref(), Some("u-1"));
    }

    #[tokio::test]
    async fn test_uuid_backfilled_on_read() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([[test_account("a1", None)]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = AccountRepository::new(db);
        let account = repo.find_by_id("a1").await.unwrap().unwrap();
        assert!(account.uuid.is_some());
    }

    #[tokio::test]
    async fn test_is_following() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([vec![test_follow("f1", "a1", "a2")]])
                .append_query_results([Vec::<follow::Model>::new()])
                .into_connection(),
        );

        let repo = AccountRepository::new(db);
        assert!(repo.is_following("a1", "a2").await.unwrap());
        assert!(!repo.is_following("a2", "a1").await.unwrap());
    }

    #[tokio::test]
    async fn test_save_missing_account_fails() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = AccountRepository::new(db);
        let mut aggregate = AccountAggregate::new(test_account("ghost", Some("u-1")));

        let result = repo.save(&mut aggregate).await;
        assert!(matches!(result, Err(AppError::AccountNotFound(_))));
    }

    #[tokio::test]
    async fn test_save_block_inserts_edge_and_severs_follows() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                // profile row update
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                // block existence check: absent
                .append_query_results([Vec::<block::Model>::new()])
                // block insert + fetch-back
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([[block::Model {
                    id: "b1".to_string(),
                    blocker_id: "a1".to_string(),
                    blocked_id: "a2".to_string(),
                    created_at: Utc::now().into(),
                }]])
                // follow severing (both directions, one DELETE)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                }])
                .into_connection(),
        );

        let repo = AccountRepository::new(db);
        let mut aggregate = AccountAggregate::new(test_account("a1", Some("u-1")));
        aggregate.block("a2");

        repo.save(&mut aggregate).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_applies_follow_event() {
        // update row, check-existing (none), insert follow
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([Vec::<follow::Model>::new()])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([vec![test_follow("f1", "a1", "a2")]])
                .into_connection(),
        );

        let repo = AccountRepository::new(db);
        let mut aggregate = AccountAggregate::new(test_account("a1", Some("u-1")));
        aggregate.follow("a2");

        repo.save(&mut aggregate).await.unwrap();
        // Events were drained by save.
        assert!(aggregate.pending_events().is_empty());
    }
}
