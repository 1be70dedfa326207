//! Auth endpoints.

use axum::{Json, Router, extract::State, routing::post};
use courier_common::AppResult;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{middleware::AppState, response::ApiResponse};

/// Registration request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 128))]
    pub username: String,
}

/// Registration response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub id: String,
    pub username: String,
    pub token: String,
}

/// Register a new user.
///
/// Provisioning runs the new-user backfill here so the account starts with
/// deliveries for every global notification that predates it.
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<ApiResponse<RegisterResponse>> {
    req.validate()?;

    let user = state.user_service.register(&req.username).await?;

    state
        .notification_service
        .backfill_for_new_user(&user.id)
        .await;

    Ok(ApiResponse::ok(RegisterResponse {
        id: user.id,
        username: user.username,
        token: user.token.unwrap_or_default(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/register", post(register))
}
