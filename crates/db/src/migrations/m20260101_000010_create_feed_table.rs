//! Create feeds table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Feed::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Feed::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Feed::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Feed::PostId).string_len(32).not_null())
                    .col(ColumnDef::new(Feed::AuthorId).string_len(32).not_null())
                    .col(ColumnDef::new(Feed::PostType).integer().not_null())
                    .col(ColumnDef::new(Feed::Audience).integer().not_null())
                    .col(
                        ColumnDef::new(Feed::PublishedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_feeds_user")
                            .from(Feed::Table, Feed::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique pair: one row per (user, post)
        manager
            .create_index(
                Index::create()
                    .name("idx_feeds_user_post")
                    .table(Feed::Table)
                    .col(Feed::UserId)
                    .col(Feed::PostId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: user + published (timeline pagination)
        manager
            .create_index(
                Index::create()
                    .name("idx_feeds_user_published")
                    .table(Feed::Table)
                    .col(Feed::UserId)
                    .col(Feed::PublishedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Feed::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Feed {
    #[sea_orm(iden = "feeds")]
    Table,
    Id,
    UserId,
    PostId,
    AuthorId,
    PostType,
    Audience,
    PublishedAt,
}

#[derive(DeriveIden)]
enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
}
