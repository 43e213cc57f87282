//! Sensor-feed proxy.
//!
//! Forwards the configured upstream's JSON verbatim; any failure maps to
//! the fixed `{"error": …}` shape with status 500.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::types::ApiContext;

/// `GET /api/lifi`
pub async fn proxy(State(ctx): State<ApiContext>) -> Response {
    match ctx.feed.fetch_raw().await {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            tracing::error!("LiFi feed fetch failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Failed to fetch LiFi data" })),
            )
                .into_response()
        }
    }
}
