//! Create delivery table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Delivery::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Delivery::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Delivery::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Delivery::NotificationId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Delivery::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Delivery::ReadAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Delivery::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_delivery_user")
                            .from(Delivery::Table, Delivery::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    // No FK to notification: the retention sweep purges
                    // notification and delivery rows independently, so a
                    // delivery may briefly outlive its parent.
                    .to_owned(),
            )
            .await?;

        // Unique: (user_id, notification_id) — at most one delivery per user
        // per notification; concurrent fan-out/backfill races resolve here
        manager
            .create_index(
                Index::create()
                    .name("uq_delivery_user_notification")
                    .table(Delivery::Table)
                    .col(Delivery::UserId)
                    .col(Delivery::NotificationId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, is_read) (for unread count)
        manager
            .create_index(
                Index::create()
                    .name("idx_delivery_user_is_read")
                    .table(Delivery::Table)
                    .col(Delivery::UserId)
                    .col(Delivery::IsRead)
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, created_at) (for feed listing)
        manager
            .create_index(
                Index::create()
                    .name("idx_delivery_user_created_at")
                    .table(Delivery::Table)
                    .col(Delivery::UserId)
                    .col(Delivery::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: notification_id (for parent-side lookups and the sweep)
        manager
            .create_index(
                Index::create()
                    .name("idx_delivery_notification_id")
                    .table(Delivery::Table)
                    .col(Delivery::NotificationId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Delivery::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Delivery {
    Table,
    Id,
    UserId,
    NotificationId,
    IsRead,
    ReadAt,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
