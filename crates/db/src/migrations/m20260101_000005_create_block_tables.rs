//! Create blocks and domain_blocks tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Block::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Block::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Block::BlockerId).string_len(32).not_null())
                    .col(ColumnDef::new(Block::BlockedId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Block::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blocks_blocker")
                            .from(Block::Table, Block::BlockerId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blocks_pair")
                    .table(Block::Table)
                    .col(Block::BlockerId)
                    .col(Block::BlockedId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DomainBlock::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DomainBlock::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DomainBlock::BlockerId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DomainBlock::Domain)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DomainBlock::DomainHash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DomainBlock::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_domain_blocks_blocker")
                            .from(DomainBlock::Table, DomainBlock::BlockerId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_domain_blocks_pair")
                    .table(DomainBlock::Table)
                    .col(DomainBlock::BlockerId)
                    .col(DomainBlock::DomainHash)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DomainBlock::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Block::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Block {
    #[sea_orm(iden = "blocks")]
    Table,
    Id,
    BlockerId,
    BlockedId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum DomainBlock {
    #[sea_orm(iden = "domain_blocks")]
    Table,
    Id,
    BlockerId,
    Domain,
    DomainHash,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Account {
    #[sea_orm(iden = "accounts")]
    Table,
    Id,
}
