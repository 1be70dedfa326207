//! Create notification table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Notification::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notification::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Notification::Kind)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notification::Title)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notification::Body).text().not_null())
                    .col(
                        ColumnDef::new(Notification::Metadata)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notification::IsGlobal)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notification::TargetUsers)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notification::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (kind, created_at)
        manager
            .create_index(
                Index::create()
                    .name("idx_notification_kind_created_at")
                    .table(Notification::Table)
                    .col(Notification::Kind)
                    .col(Notification::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: (is_global, created_at) (for backfill enumeration)
        manager
            .create_index(
                Index::create()
                    .name("idx_notification_is_global_created_at")
                    .table(Notification::Table)
                    .col(Notification::IsGlobal)
                    .col(Notification::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: created_at (retention sweep runs against this externally;
        // rows older than the 90-day window are purged out of band)
        manager
            .create_index(
                Index::create()
                    .name("idx_notification_created_at")
                    .table(Notification::Table)
                    .col(Notification::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notification::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Notification {
    Table,
    Id,
    Kind,
    Title,
    Body,
    Metadata,
    IsGlobal,
    TargetUsers,
    CreatedAt,
}
