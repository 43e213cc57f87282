//! Dashboard endpoint — one fetch for everything the profile page shows.
//!
//! Also the visit logger: each dashboard fetch is one page load, and each
//! page load records exactly one visit. The visit list returned in the
//! response is read before the insert, so the current load never shows up
//! in its own history.

use axum::extract::{OriginalUri, State};
use axum::http::{header, HeaderMap};
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::models::{ClientMetadata, ProfileRecord, VisitRecord};
use crate::summary;

/// How many history entries the dashboard shows before "show more".
pub const PROFILE_HISTORY_PREVIEW: usize = 2;
pub const VISIT_HISTORY_PREVIEW: usize = 2;

#[derive(Serialize)]
pub struct UserView {
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub user: UserView,
    /// The current profile: newest row of the history, if any.
    pub profile: Option<ProfileRecord>,
    pub profile_history: Vec<ProfileRecord>,
    pub profile_history_total: usize,
    pub visits: Vec<VisitRecord>,
    pub visits_total: usize,
    /// The summary flow is only offered when history exists.
    pub analysis_available: bool,
    pub fetched_at: String,
}

/// `GET /api/dashboard`
pub async fn dashboard(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, ApiError> {
    let email = &user.user.email;

    let history = ctx.store.list_profile_history(email).await?;
    let visits = ctx.store.list_visits(email).await?;

    // Record this page load — once per fetch, after the reads above.
    let agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    let metadata = ClientMetadata::from_request(agent, &uri.to_string());
    ctx.store.record_visit(email, &metadata).await?;

    let profile = history.first().cloned();
    let analysis_available = summary::analysis_available(&history);
    let profile_history_total = history.len();
    let visits_total = visits.len();

    Ok(Json(DashboardResponse {
        user: UserView {
            email: user.user.email.clone(),
            name: user.user.name.clone(),
            picture: user.user.picture.clone(),
        },
        profile,
        profile_history: history
            .into_iter()
            .take(PROFILE_HISTORY_PREVIEW)
            .collect(),
        profile_history_total,
        visits: visits.into_iter().take(VISIT_HISTORY_PREVIEW).collect(),
        visits_total,
        analysis_available,
        fetched_at: chrono::Utc::now().to_rfc3339(),
    }))
}
