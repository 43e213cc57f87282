//! Data-access facade for the hosted relational backend.
//!
//! The backend is an external collaborator consumed over its REST
//! contract: named record collections addressed by URL, filtered with
//! `column=eq.value` query parameters and ordered with `order=column.desc`,
//! authenticated by an API key pair of headers.
//!
//! Two collections exist: `user_profiles` (append-only intake history)
//! and `user_visits` (append-only page-load log). Rows coming back are
//! validated in `rows` before anything downstream trusts them.

pub mod rows;

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::config::Settings;
use crate::models::{ClientMetadata, ProfileFields, ProfileRecord, VisitRecord};

/// Collection names on the hosted backend.
const PROFILES: &str = "user_profiles";
const VISITS: &str = "user_visits";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors from the data-access facade.
///
/// Callers surface the message as a user-visible string; nothing here
/// retries.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend is not configured: {0}")]
    Configuration(String),
    #[error("Backend error ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Malformed row from backend: {0}")]
    InvalidRow(String),
}

/// Client for the hosted relational backend.
pub struct BackendClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(settings: &Settings) -> Self {
        Self::with_endpoint(&settings.backend_url, &settings.backend_api_key)
    }

    pub fn with_endpoint(base_url: &str, api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        }
    }

    // ── Operations ──────────────────────────────────────────

    /// Append a new profile row stamped with the current UTC time.
    ///
    /// History is append-only; the newest row becomes the current profile.
    pub async fn upsert_profile(
        &self,
        user_id: &str,
        fields: &ProfileFields,
    ) -> Result<(), BackendError> {
        let row = serde_json::json!({
            "user_id": user_id,
            "title": fields.title,
            "description": fields.description,
            "category": fields.category,
            "notes": fields.notes,
            "updated_at": Utc::now().to_rfc3339(),
        });
        self.insert_row(PROFILES, &row).await
    }

    /// The newest profile row for a user, or `None` if they never saved one.
    pub async fn current_profile(
        &self,
        user_id: &str,
    ) -> Result<Option<ProfileRecord>, BackendError> {
        let mut history = self.list_profile_history(user_id).await?;
        if history.is_empty() {
            Ok(None)
        } else {
            Ok(Some(history.swap_remove(0)))
        }
    }

    /// All profile rows for a user, newest first.
    pub async fn list_profile_history(
        &self,
        user_id: &str,
    ) -> Result<Vec<ProfileRecord>, BackendError> {
        let raw = self
            .select_rows(PROFILES, user_id, "updated_at")
            .await?;
        let mut records = raw
            .into_iter()
            .map(|row| rows::parse_profile_row(&row))
            .collect::<Result<Vec<_>, _>>()?;
        // Descending order is requested from the backend, then re-enforced
        // locally so the invariant holds even against a misbehaving remote.
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }

    /// All visit rows for a user, newest first.
    pub async fn list_visits(
        &self,
        user_id: &str,
    ) -> Result<Vec<VisitRecord>, BackendError> {
        let raw = self.select_rows(VISITS, user_id, "visit_time").await?;
        let mut records = raw
            .into_iter()
            .map(|row| rows::parse_visit_row(&row))
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| b.visit_time.cmp(&a.visit_time));
        Ok(records)
    }

    /// Insert one visit row. Visits are never updated or deleted; the
    /// backend stamps `visit_time` on insert.
    pub async fn record_visit(
        &self,
        user_id: &str,
        metadata: &ClientMetadata,
    ) -> Result<(), BackendError> {
        let row = serde_json::json!({
            "user_id": user_id,
            "visit_data": metadata,
        });
        self.insert_row(VISITS, &row).await
    }

    // ── HTTP plumbing ───────────────────────────────────────

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection)
    }

    async fn select_rows(
        &self,
        collection: &str,
        user_id: &str,
        order_column: &str,
    ) -> Result<Vec<Value>, BackendError> {
        let response = self
            .client
            .get(self.collection_url(collection))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("order", format!("{order_column}.desc")),
            ])
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Upstream {
                status: status.as_u16(),
                message: remote_error_message(response).await,
            });
        }

        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| BackendError::InvalidRow(e.to_string()))
    }

    async fn insert_row(
        &self,
        collection: &str,
        row: &impl Serialize,
    ) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.collection_url(collection))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Upstream {
                status: status.as_u16(),
                message: remote_error_message(response).await,
            });
        }
        Ok(())
    }
}

fn map_transport_error(err: reqwest::Error) -> BackendError {
    if err.is_connect() {
        BackendError::Network(format!("Cannot reach backend: {err}"))
    } else if err.is_timeout() {
        BackendError::Network(format!(
            "Backend request timed out after {REQUEST_TIMEOUT_SECS}s"
        ))
    } else {
        BackendError::Network(err.to_string())
    }
}

/// The remote error message is passed through to the user verbatim.
/// The backend reports errors as `{"message": …}`; fall back to the body.
async fn remote_error_message(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or(body)
}
