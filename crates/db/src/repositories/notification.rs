//! Notification repository.

use std::sync::Arc;

use courier_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect,
};

use crate::entities::{Notification, notification};

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Persist a new notification.
    pub async fn create(&self, model: notification::ActiveModel) -> AppResult<notification::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the ids of every global notification still in the store.
    ///
    /// Used by the new-user backfill to extend global coverage to users who
    /// did not exist at fan-out time.
    pub async fn list_global_ids(&self) -> AppResult<Vec<String>> {
        Notification::find()
            .filter(notification::Column::IsGlobal.eq(true))
            .select_only()
            .column(notification::Column::Id)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
