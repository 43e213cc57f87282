//! Mail relay endpoint.
//!
//! The response shapes are a fixed contract with existing callers:
//! 200 `{success, messageId}` or 500 `{error, details, code, response}`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::api::types::ApiContext;

#[derive(Deserialize)]
pub struct SendEmailRequest {
    pub to: String,
    pub subject: String,
    pub content: String,
}

/// `POST /api/send-email`
pub async fn send(
    State(ctx): State<ApiContext>,
    Json(request): Json<SendEmailRequest>,
) -> Response {
    tracing::info!(
        to = %request.to,
        subject = %request.subject,
        content_length = request.content.len(),
        "Starting email send"
    );

    match ctx
        .mail
        .send(&request.to, &request.subject, &request.content)
        .await
    {
        Ok(receipt) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "messageId": receipt.message_id,
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(details = %e.details(), "Email send failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": e.to_string(),
                    "details": e.details(),
                    "code": e.code(),
                    "response": e.response(),
                })),
            )
                .into_response()
        }
    }
}
