//! Create posts table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Post::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Post::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Post::Uuid).string_len(36).not_null())
                    .col(ColumnDef::new(Post::Type).integer().not_null())
                    .col(ColumnDef::new(Post::Audience).integer().not_null())
                    .col(ColumnDef::new(Post::AuthorId).string_len(32).not_null())
                    .col(ColumnDef::new(Post::Title).string_len(512))
                    .col(ColumnDef::new(Post::Excerpt).text())
                    .col(ColumnDef::new(Post::Summary).text())
                    .col(ColumnDef::new(Post::Content).text())
                    .col(ColumnDef::new(Post::Url).string_len(1024))
                    .col(ColumnDef::new(Post::ImageUrl).string_len(1024))
                    .col(
                        ColumnDef::new(Post::PublishedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Post::InReplyTo).string_len(32))
                    .col(ColumnDef::new(Post::ThreadRoot).string_len(32))
                    .col(
                        ColumnDef::new(Post::LikeCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Post::RepostCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Post::ReplyCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Post::ReadingTimeMinutes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Post::Attachments).json())
                    .col(ColumnDef::new(Post::ApId).string_len(1024).not_null())
                    .col(ColumnDef::new(Post::ApIdHash).string_len(64).not_null())
                    .col(ColumnDef::new(Post::Metadata).json())
                    .col(ColumnDef::new(Post::DeletedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_posts_author")
                            .from(Post::Table, Post::AuthorId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_posts_ap_id_hash")
                    .table(Post::Table)
                    .col(Post::ApIdHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: author + published (outbox/liked pagination)
        manager
            .create_index(
                Index::create()
                    .name("idx_posts_author_published")
                    .table(Post::Table)
                    .col(Post::AuthorId)
                    .col(Post::PublishedAt)
                    .to_owned(),
            )
            .await?;

        // Index: thread root (thread collection)
        manager
            .create_index(
                Index::create()
                    .name("idx_posts_thread_root")
                    .table(Post::Table)
                    .col(Post::ThreadRoot)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Post::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Post {
    #[sea_orm(iden = "posts")]
    Table,
    Id,
    Uuid,
    Type,
    Audience,
    AuthorId,
    Title,
    Excerpt,
    Summary,
    Content,
    Url,
    ImageUrl,
    PublishedAt,
    InReplyTo,
    ThreadRoot,
    LikeCount,
    RepostCount,
    ReplyCount,
    ReadingTimeMinutes,
    Attachments,
    ApId,
    ApIdHash,
    Metadata,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Account {
    #[sea_orm(iden = "accounts")]
    Table,
    Id,
}
