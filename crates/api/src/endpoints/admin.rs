//! Admin endpoints: notification authoring and provisioning hooks.

use axum::{Json, Router, extract::State, routing::post};
use courier_common::{AppError, AppResult};
use courier_core::CreateNotificationInput;
use courier_db::entities::{notification, user};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::endpoints::notifications::kind_to_string;
use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

fn require_admin(user: &user::Model) -> AppResult<()> {
    if user.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden("admin privileges required".to_string()))
    }
}

/// Notification kind request parameter.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindParam {
    NewVideo,
    CourseUpdate,
    System,
}

impl From<KindParam> for notification::NotificationKind {
    fn from(kind: KindParam) -> Self {
        match kind {
            KindParam::NewVideo => Self::NewVideo,
            KindParam::CourseUpdate => Self::CourseUpdate,
            KindParam::System => Self::System,
        }
    }
}

/// Create notification request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub kind: KindParam,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 1000))]
    pub body: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub is_global: bool,
    #[serde(default)]
    pub target_users: Vec<String>,
}

/// Created notification response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub metadata: serde_json::Value,
    pub is_global: bool,
    pub created_at: String,
}

impl From<notification::Model> for NotificationResponse {
    fn from(n: notification::Model) -> Self {
        Self {
            id: n.id,
            kind: kind_to_string(&n.kind),
            title: n.title,
            body: n.body,
            metadata: n.metadata,
            is_global: n.is_global,
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

/// Author a notification and fan it out.
///
/// The response reflects the committed notification; fan-out outcome is
/// deliberately not part of it.
async fn create_notification(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateNotificationRequest>,
) -> AppResult<ApiResponse<NotificationResponse>> {
    require_admin(&user)?;
    req.validate()?;

    let created = state
        .notification_service
        .create(CreateNotificationInput {
            kind: req.kind.into(),
            title: req.title,
            body: req.body,
            metadata: req.metadata,
            is_global: req.is_global,
            target_users: req.target_users,
        })
        .await?;

    Ok(ApiResponse::ok(created.into()))
}

/// Backfill request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillRequest {
    pub user_id: String,
}

/// Backfill global-notification deliveries for a user.
///
/// For provisioning tooling; best-effort and safe to re-run.
async fn backfill(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<BackfillRequest>,
) -> AppResult<ApiResponse<()>> {
    require_admin(&user)?;

    state
        .notification_service
        .backfill_for_new_user(&req.user_id)
        .await;

    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", post(create_notification))
        .route("/backfill", post(backfill))
}
