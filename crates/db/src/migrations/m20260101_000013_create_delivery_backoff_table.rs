//! Create delivery_backoffs table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeliveryBackoff::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeliveryBackoff::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DeliveryBackoff::InboxUrl)
                            .string_len(1024)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryBackoff::InboxUrlHash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryBackoff::FailureCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DeliveryBackoff::BackoffUntil)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DeliveryBackoff::LastError).text())
                    .col(
                        ColumnDef::new(DeliveryBackoff::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_delivery_backoffs_inbox_url_hash")
                    .table(DeliveryBackoff::Table)
                    .col(DeliveryBackoff::InboxUrlHash)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeliveryBackoff::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DeliveryBackoff {
    #[sea_orm(iden = "delivery_backoffs")]
    Table,
    Id,
    InboxUrl,
    InboxUrlHash,
    FailureCount,
    BackoffUntil,
    LastError,
    UpdatedAt,
}
