//! Summary-generation endpoint.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::summary::{self, prompt};

#[derive(Deserialize)]
pub struct AnalysisRequest {
    /// Forward the generated summary to the user's mailbox.
    #[serde(default)]
    pub email_copy: bool,
}

#[derive(Serialize)]
pub struct AnalysisResponse {
    pub summary: String,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_error: Option<String>,
}

/// `POST /api/analysis` — run the summary flow once.
///
/// Refused while the profile history is empty (the dashboard does not
/// offer the action either). A mail failure does not discard the
/// generated summary; it is reported alongside it.
pub async fn generate(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let email = &user.user.email;

    let history = ctx.store.list_profile_history(email).await?;
    if !summary::analysis_available(&history) {
        return Err(ApiError::NotAvailable(
            "No profile history available. Please update your profile to enable analysis.".into(),
        ));
    }

    // Visit and vitals context enrich the prompt but are not worth
    // failing the whole flow over; already-loaded data stays useful.
    let visits = match ctx.store.list_visits(email).await {
        Ok(visits) => visits,
        Err(e) => {
            tracing::warn!("Skipping visit context for summary: {e}");
            Vec::new()
        }
    };
    let vitals = match ctx.feed.list_vitals().await {
        Ok(readings) => readings,
        Err(e) => {
            tracing::warn!("Skipping vitals context for summary: {e}");
            Vec::new()
        }
    };

    let text =
        summary::generate_summary(ctx.generator.as_ref(), &history, &visits, &vitals).await?;

    let (email_sent, email_error) = if request.email_copy {
        let name = user.user.name.as_deref().unwrap_or(email);
        let html = prompt::build_email_html(name, &text);
        match ctx.mail.send(email, prompt::EMAIL_SUBJECT, &html).await {
            Ok(receipt) => {
                tracing::info!(message_id = %receipt.message_id, "Summary emailed");
                (true, None)
            }
            Err(e) => (
                false,
                Some(format!("Failed to send email: {}", e.details())),
            ),
        }
    } else {
        (false, None)
    };

    Ok(Json(AnalysisResponse {
        summary: text,
        email_sent,
        email_error,
    }))
}
