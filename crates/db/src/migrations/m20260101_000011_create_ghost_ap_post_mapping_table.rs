//! Create ghost_ap_post_mappings table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Mapping::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Mapping::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Mapping::GhostUuid)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Mapping::ApId).string_len(1024).not_null())
                    .col(ColumnDef::new(Mapping::ApIdHash).string_len(64).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ghost_ap_post_mappings_ghost_uuid")
                    .table(Mapping::Table)
                    .col(Mapping::GhostUuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ghost_ap_post_mappings_ap_id_hash")
                    .table(Mapping::Table)
                    .col(Mapping::ApIdHash)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Mapping::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Mapping {
    #[sea_orm(iden = "ghost_ap_post_mappings")]
    Table,
    Id,
    GhostUuid,
    ApId,
    ApIdHash,
}
