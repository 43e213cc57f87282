//! Device-vitals panel endpoints: snapshot, manual refresh, interval.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::poll::{PanelSnapshot, RefreshInterval};

/// `GET /api/device-vitals` — current panel state.
pub async fn snapshot(State(ctx): State<ApiContext>) -> Json<PanelSnapshot> {
    Json(ctx.vitals.snapshot())
}

/// `POST /api/device-vitals/refresh` — manual refresh (or retry after a
/// failure). Returns the panel state after dispatch, i.e. `loading`.
pub async fn refresh(State(ctx): State<ApiContext>) -> Json<PanelSnapshot> {
    ctx.vitals.refresh();
    Json(ctx.vitals.snapshot())
}

#[derive(Deserialize)]
pub struct IntervalRequest {
    pub interval_ms: u64,
}

/// `PUT /api/device-vitals/interval` — switch the polling interval.
pub async fn set_interval(
    State(ctx): State<ApiContext>,
    Json(request): Json<IntervalRequest>,
) -> Result<Json<PanelSnapshot>, ApiError> {
    let interval = RefreshInterval::from_millis(request.interval_ms).ok_or_else(|| {
        ApiError::BadRequest(
            "interval_ms must be one of 1000, 5000, 10000, 30000".into(),
        )
    })?;

    ctx.vitals.set_interval(interval);
    Ok(Json(ctx.vitals.snapshot()))
}
