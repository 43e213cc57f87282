//! Profile form and history endpoints.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::models::{ProfileFields, ProfileRecord, VisitRecord};

#[derive(Serialize)]
pub struct SaveResponse {
    pub success: bool,
}

/// `POST /api/profile` — append a new profile row for the signed-in user.
pub async fn save(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(fields): Json<ProfileFields>,
) -> Result<Json<SaveResponse>, ApiError> {
    if let Some(field) = fields.first_blank_field() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }

    ctx.store
        .upsert_profile(&user.user.email, &fields)
        .await?;
    tracing::info!(email = %user.user.email, "Profile updated");

    Ok(Json(SaveResponse { success: true }))
}

#[derive(Serialize)]
pub struct ProfileHistoryResponse {
    pub history: Vec<ProfileRecord>,
}

/// `GET /api/profile/history` — full history, newest first.
pub async fn history(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<ProfileHistoryResponse>, ApiError> {
    let history = ctx.store.list_profile_history(&user.user.email).await?;
    Ok(Json(ProfileHistoryResponse { history }))
}

#[derive(Serialize)]
pub struct VisitsResponse {
    pub visits: Vec<VisitRecord>,
}

/// `GET /api/visits` — full visit history, newest first.
pub async fn visits(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<VisitsResponse>, ApiError> {
    let visits = ctx.store.list_visits(&user.user.email).await?;
    Ok(Json(VisitsResponse { visits }))
}
