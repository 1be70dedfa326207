//! Notification entity.
//!
//! Notification content is written once and never mutated. Addressing is
//! either global (every known user at creation time) or an explicit target
//! list carried on the row; per-user read state lives on the delivery entity.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification kinds.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum NotificationKind {
    #[sea_orm(string_value = "new_video")]
    NewVideo,
    #[sea_orm(string_value = "course_update")]
    CourseUpdate,
    #[sea_orm(string_value = "system")]
    System,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Notification kind
    pub kind: NotificationKind,

    /// Short headline (<= 200 chars, trimmed)
    pub title: String,

    /// Message body (<= 1000 chars, trimmed)
    #[sea_orm(column_type = "Text")]
    pub body: String,

    /// Kind-specific attribute bag, stored and echoed back verbatim
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,

    /// Addressed to every current user?
    #[sea_orm(default_value = false)]
    pub is_global: bool,

    /// Explicit recipient user ids (JSON array, used when not global)
    #[sea_orm(column_type = "JsonBinary")]
    pub target_users: Json,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::delivery::Entity")]
    Deliveries,
}

impl Related<super::delivery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deliveries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
