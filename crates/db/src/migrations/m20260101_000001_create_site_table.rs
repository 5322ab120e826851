//! Create sites table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Site::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Site::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Site::Host).string_len(256).not_null())
                    .col(
                        ColumnDef::new(Site::WebhookSecret)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Site::GhostUuid).string_len(36))
                    .col(
                        ColumnDef::new(Site::Disabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Site::CreatedAt)
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
                    .name("idx_sites_host")
                    .table(Site::Table)
                    .col(Site::Host)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Site::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Site {
    #[sea_orm(iden = "sites")]
    Table,
    Id,
    Host,
    WebhookSecret,
    GhostUuid,
    Disabled,
    CreatedAt,
}
