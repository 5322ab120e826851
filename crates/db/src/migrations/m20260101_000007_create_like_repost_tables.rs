//! Create likes and reposts tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

async fn create_edge_table(
    manager: &SchemaManager<'_>,
    table: EdgeTable,
    index_prefix: &str,
) -> Result<(), DbErr> {
    manager
        .create_table(
            Table::create()
                .table(table.clone())
                .if_not_exists()
                .col(
                    ColumnDef::new(EdgeColumn::Id)
                        .string_len(32)
                        .not_null()
                        .primary_key(),
                )
                .col(ColumnDef::new(EdgeColumn::PostId).string_len(32).not_null())
                .col(
                    ColumnDef::new(EdgeColumn::AccountId)
                        .string_len(32)
                        .not_null(),
                )
                .col(
                    ColumnDef::new(EdgeColumn::CreatedAt)
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
                .name(format!("idx_{index_prefix}_pair"))
                .table(table)
                .col(EdgeColumn::PostId)
                .col(EdgeColumn::AccountId)
                .unique()
                .to_owned(),
        )
        .await
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        create_edge_table(manager, EdgeTable::Likes, "likes").await?;
        create_edge_table(manager, EdgeTable::Reposts, "reposts").await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EdgeTable::Reposts).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EdgeTable::Likes).to_owned())
            .await
    }
}

#[derive(DeriveIden, Clone)]
enum EdgeTable {
    #[sea_orm(iden = "likes")]
    Likes,
    #[sea_orm(iden = "reposts")]
    Reposts,
}

#[derive(DeriveIden)]
enum EdgeColumn {
    Id,
    PostId,
    AccountId,
    CreatedAt,
}
