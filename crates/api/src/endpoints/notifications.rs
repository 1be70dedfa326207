//! Notifications endpoints.

use axum::{Json, Router, extract::State, routing::post};
use courier_common::{AppError, AppResult};
use courier_core::{FeedItem, NotificationFeed};
use courier_db::entities::notification::NotificationKind;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Feed page request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FeedRequest {
    /// Page number (1-based).
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u64,
    /// Page size (max 50).
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 50))]
    pub limit: u64,
}

const fn default_page() -> u64 {
    1
}

const fn default_limit() -> u64 {
    10
}

/// Feed response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub notifications: Vec<FeedItemResponse>,
    pub total: u64,
    pub has_more: bool,
    pub page: u64,
    pub limit: u64,
}

/// One feed entry: notification content plus the caller's read state.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItemResponse {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub metadata: serde_json::Value,
    pub created_at: String,
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<String>,
}

pub(crate) fn kind_to_string(kind: &NotificationKind) -> String {
    match kind {
        NotificationKind::NewVideo => "new_video".to_string(),
        NotificationKind::CourseUpdate => "course_update".to_string(),
        NotificationKind::System => "system".to_string(),
    }
}

impl From<FeedItem> for FeedItemResponse {
    fn from(item: FeedItem) -> Self {
        Self {
            id: item.id,
            kind: kind_to_string(&item.kind),
            title: item.title,
            body: item.body,
            metadata: item.metadata,
            created_at: item.created_at.to_rfc3339(),
            is_read: item.is_read,
            read_at: item.read_at.map(|t| t.to_rfc3339()),
        }
    }
}

impl From<NotificationFeed> for FeedResponse {
    fn from(feed: NotificationFeed) -> Self {
        Self {
            notifications: feed.notifications.into_iter().map(Into::into).collect(),
            total: feed.total,
            has_more: feed.has_more,
            page: feed.page,
            limit: feed.limit,
        }
    }
}

/// Get the authenticated user's paginated feed.
async fn get_feed(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<FeedRequest>,
) -> AppResult<ApiResponse<FeedResponse>> {
    req.validate()?;

    let feed = state
        .notification_service
        .get_user_feed(&user.id, req.page, req.limit)
        .await?;

    Ok(ApiResponse::ok(feed.into()))
}

/// Mark notification as read request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsReadRequest {
    pub notification_id: String,
}

/// Mark one notification as read.
///
/// "Nothing to transition" (no such delivery, or already read) surfaces as
/// not-found rather than success, per the read-state contract.
async fn mark_as_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<MarkAsReadRequest>,
) -> AppResult<ApiResponse<()>> {
    let transitioned = state
        .notification_service
        .mark_as_read(&user.id, &req.notification_id)
        .await?;

    if !transitioned {
        return Err(AppError::NotFound(
            "notification not found or already read".to_string(),
        ));
    }

    Ok(ApiResponse::ok(()))
}

/// Mark all as read response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllAsReadResponse {
    pub count: u64,
}

/// Mark all of the authenticated user's notifications as read.
async fn mark_all_as_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MarkAllAsReadResponse>> {
    let count = state
        .notification_service
        .mark_all_as_read(&user.id)
        .await?;

    Ok(ApiResponse::ok(MarkAllAsReadResponse { count }))
}

/// Unread count response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub count: u64,
}

/// Get the authenticated user's unread notification count.
async fn unread_count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UnreadCountResponse>> {
    let count = state
        .notification_service
        .get_unread_count(&user.id)
        .await?;

    Ok(ApiResponse::ok(UnreadCountResponse { count }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(get_feed))
        .route("/mark-as-read", post(mark_as_read))
        .route("/mark-all-as-read", post(mark_all_as_read))
        .route("/unread-count", post(unread_count))
}
