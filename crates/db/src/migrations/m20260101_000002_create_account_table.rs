//! Create accounts table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Account::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Account::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Account::Uuid).string_len(36))
                    .col(ColumnDef::new(Account::Username).string_len(256).not_null())
                    .col(ColumnDef::new(Account::Name).string_len(512))
                    .col(ColumnDef::new(Account::Bio).text())
                    .col(ColumnDef::new(Account::AvatarUrl).string_len(1024))
                    .col(ColumnDef::new(Account::BannerImageUrl).string_len(1024))
                    .col(ColumnDef::new(Account::Url).string_len(1024))
                    .col(ColumnDef::new(Account::ApId).string_len(1024).not_null())
                    .col(ColumnDef::new(Account::ApIdHash).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Account::ApInboxUrl)
                            .string_len(1024)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Account::ApSharedInboxUrl).string_len(1024))
                    .col(ColumnDef::new(Account::ApOutboxUrl).string_len(1024))
                    .col(ColumnDef::new(Account::ApFollowersUrl).string_len(1024))
                    .col(ColumnDef::new(Account::ApFollowingUrl).string_len(1024))
                    .col(ColumnDef::new(Account::ApLikedUrl).string_len(1024))
                    .col(ColumnDef::new(Account::ApPublicKey).text())
                    .col(ColumnDef::new(Account::ApPrivateKey).text())
                    .col(ColumnDef::new(Account::Domain).string_len(256).not_null())
                    .col(
                        ColumnDef::new(Account::DomainHash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Account::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Account::UpdatedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Account::DeletedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Unique: case-folded ap_id (via hash)
        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_ap_id_hash")
                    .table(Account::Table)
                    .col(Account::ApIdHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: domain hash (for domain-block severing)
        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_domain_hash")
                    .table(Account::Table)
                    .col(Account::DomainHash)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Account::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Account {
    #[sea_orm(iden = "accounts")]
    Table,
    Id,
    Uuid,
    Username,
    Name,
    Bio,
    AvatarUrl,
    BannerImageUrl,
    Url,
    ApId,
    ApIdHash,
    ApInboxUrl,
    ApSharedInboxUrl,
    ApOutboxUrl,
    ApFollowersUrl,
    ApFollowingUrl,
    ApLikedUrl,
    ApPublicKey,
    ApPrivateKey,
    Domain,
    DomainHash,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
