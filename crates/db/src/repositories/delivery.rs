//! Delivery repository.
//!
//! Owns the per-(user, notification) read-state rows: best-effort bulk
//! creation for fan-out, the joined feed page, and the conditional read-state
//! transitions.

use std::sync::Arc;

use chrono::Utc;
use courier_common::{AppError, AppResult};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    AccessMode, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IsolationLevel, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, TransactionTrait,
};
use tracing::warn;

use crate::entities::{Delivery, Notification, delivery, notification};

/// Rows per bulk-insert statement during fan-out.
const INSERT_CHUNK_SIZE: usize = 1000;

/// One page of a user's feed: (delivery, parent notification) pairs plus the
/// pre-pagination total, read from a single snapshot.
pub struct FeedPage {
    /// Page window rows, most recent notification first.
    pub items: Vec<(delivery::Model, notification::Model)>,
    /// Count of all of the user's delivery rows, independent of the window.
    pub total: u64,
}

/// Delivery repository for database operations.
#[derive(Clone)]
pub struct DeliveryRepository {
    db: Arc<DatabaseConnection>,
}

impl DeliveryRepository {
    /// Create a new delivery repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Bulk-insert delivery rows, ignoring unique-key conflicts and dropping
    /// only the rows that cannot be stored.
    ///
    /// The unique index on (`user_id`, `notification_id`) makes concurrent
    /// fan-out and backfill idempotent: the losing insert is dropped by
    /// `ON CONFLICT DO NOTHING` rather than failing the batch. Non-duplicate
    /// row failures (an FK violation from a stale recipient id, say) abort
    /// the whole multi-row statement, so a failed chunk is retried row by
    /// row; each losing row is logged, the rest of the chunk still lands.
    pub async fn insert_many_ignore_conflicts(
        &self,
        models: Vec<delivery::ActiveModel>,
    ) -> AppResult<()> {
        if models.is_empty() {
            return Ok(());
        }

        for chunk in models.chunks(INSERT_CHUNK_SIZE) {
            if let Err(e) = self.insert_chunk(chunk).await {
                warn!(error = %e, rows = chunk.len(), "bulk delivery insert failed, retrying row by row");
                for model in chunk {
                    if let Err(e) = self.insert_one(model.clone()).await {
                        warn!(error = %e, "delivery row dropped");
                    }
                }
            }
        }

        Ok(())
    }

    async fn insert_chunk(&self, chunk: &[delivery::ActiveModel]) -> Result<(), DbErr> {
        let insert = Delivery::insert_many(chunk.to_vec()).on_conflict(Self::conflict_clause());
        match insert.exec(self.db.as_ref()).await {
            // Every row in the chunk already existed; that is idempotence at
            // work, not a failure.
            Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn insert_one(&self, model: delivery::ActiveModel) -> Result<(), DbErr> {
        let insert = Delivery::insert(model).on_conflict(Self::conflict_clause());
        match insert.exec(self.db.as_ref()).await {
            Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn conflict_clause() -> OnConflict {
        OnConflict::columns([delivery::Column::UserId, delivery::Column::NotificationId])
            .do_nothing()
            .to_owned()
    }

    /// Read one feed page for a user: the windowed (delivery, notification)
    /// rows joined on content, plus the total delivery count.
    ///
    /// Both reads run inside one repeatable-read transaction so `total` and
    /// the window come from the same snapshot even under concurrent fan-out
    /// (at read committed each statement would take its own). The inner join
    /// silently drops deliveries whose parent notification has already been
    /// purged by the retention sweep.
    pub async fn feed_page(&self, user_id: &str, skip: u64, limit: u64) -> AppResult<FeedPage> {
        let txn = self
            .db
            .begin_with_config(
                Some(IsolationLevel::RepeatableRead),
                Some(AccessMode::ReadOnly),
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let total = Delivery::find()
            .filter(delivery::Column::UserId.eq(user_id))
            .count(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let rows = Delivery::find()
            .filter(delivery::Column::UserId.eq(user_id))
            .join(JoinType::InnerJoin, delivery::Relation::Notification.def())
            .select_also(Notification)
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .offset(skip)
            .limit(limit)
            .all(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let items = rows
            .into_iter()
            .filter_map(|(d, n)| n.map(|n| (d, n)))
            .collect();

        Ok(FeedPage { items, total })
    }

    /// Atomically transition one delivery from unread to read.
    ///
    /// A single conditional update: the `is_read = false` predicate and the
    /// mutation are one statement, so two racing calls can never both win.
    /// Returns true iff a row transitioned.
    pub async fn mark_read(&self, user_id: &str, notification_id: &str) -> AppResult<bool> {
        let result = Delivery::update_many()
            .filter(delivery::Column::UserId.eq(user_id))
            .filter(delivery::Column::NotificationId.eq(notification_id))
            .filter(delivery::Column::IsRead.eq(false))
            .col_expr(delivery::Column::IsRead, Expr::value(true))
            .col_expr(delivery::Column::ReadAt, Expr::value(Utc::now()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Atomically transition every unread delivery for a user to read.
    ///
    /// Returns the number of rows that actually transitioned (0 if none were
    /// unread).
    pub async fn mark_all_read(&self, user_id: &str) -> AppResult<u64> {
        let result = Delivery::update_many()
            .filter(delivery::Column::UserId.eq(user_id))
            .filter(delivery::Column::IsRead.eq(false))
            .col_expr(delivery::Column::IsRead, Expr::value(true))
            .col_expr(delivery::Column::ReadAt, Expr::value(Utc::now()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Count unread deliveries for a user.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        Delivery::find()
            .filter(delivery::Column::UserId.eq(user_id))
            .filter(delivery::Column::IsRead.eq(false))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
