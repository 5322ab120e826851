//! Database migrations.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20260101_000001_create_site_table;
mod m20260101_000002_create_account_table;
mod m20260101_000003_create_user_table;
mod m20260101_000004_create_follow_table;
mod m20260101_000005_create_block_tables;
mod m20260101_000006_create_post_table;
mod m20260101_000007_create_like_repost_tables;
mod m20260101_000008_create_mention_table;
mod m20260101_000009_create_notification_table;
mod m20260101_000010_create_feed_table;
mod m20260101_000011_create_ghost_ap_post_mapping_table;
mod m20260101_000012_create_key_value_table;
mod m20260101_000013_create_delivery_backoff_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_site_table::Migration),
            Box::new(m20260101_000002_create_account_table::Migration),
            Box::new(m20260101_000003_create_user_table::Migration),
            Box::new(m20260101_000004_create_follow_table::Migration),
            Box::new(m20260101_000005_create_block_tables::Migration),
            Box::new(m20260101_000006_create_post_table::Migration),
            Box::new(m20260101_000007_create_like_repost_tables::Migration),
            Box::new(m20260101_000008_create_mention_table::Migration),
            Box::new(m20260101_000009_create_notification_table::Migration),
            Box::new(m20260101_000010_create_feed_table::Migration),
            Box::new(m20260101_000011_create_ghost_ap_post_mapping_table::Migration),
            Box::new(m20260101_000012_create_key_value_table::Migration),
            Box::new(m20260101_000013_create_delivery_backoff_table::Migration),
        ]
    }
}
