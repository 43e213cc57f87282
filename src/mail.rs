//! Mail relay: one-shot sends through the Gmail REST API.
//!
//! The client is constructed from `Settings` and passed in shared state;
//! credentials are never read from module-level globals. Each send
//! exchanges the refresh token for an access token, builds a MIME message
//! with a base64url-encoded body, and posts it once. There is no retry
//! and no idempotency key — a timeout after a successful send can
//! duplicate on caller retry.

use std::time::Duration;

use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

use crate::config::Settings;

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GMAIL_SEND_URL: &str =
    "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Mail failures, specialized by substring match on the provider message.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Google OAuth credentials are not properly configured")]
    MissingCredentials,
    #[error("OAuth client is not authorized. Please check your Google Cloud Console configuration.")]
    Unauthorized { details: String },
    #[error("Refresh token is invalid or expired. Please update your refresh token.")]
    InvalidGrant { details: String },
    #[error("Failed to send email")]
    Send {
        details: String,
        code: Option<u16>,
        response: Option<Value>,
    },
    #[error("Network error: {0}")]
    Network(String),
}

impl MailError {
    /// Raw provider detail for the relay response body.
    pub fn details(&self) -> String {
        match self {
            MailError::MissingCredentials => self.to_string(),
            MailError::Unauthorized { details }
            | MailError::InvalidGrant { details }
            | MailError::Send { details, .. } => details.clone(),
            MailError::Network(details) => details.clone(),
        }
    }

    /// Upstream HTTP status, when one was received.
    pub fn code(&self) -> Option<u16> {
        match self {
            MailError::Send { code, .. } => *code,
            MailError::Unauthorized { .. } | MailError::InvalidGrant { .. } => Some(401),
            _ => None,
        }
    }

    /// Upstream response body, when one was received.
    pub fn response(&self) -> Option<Value> {
        match self {
            MailError::Send { response, .. } => response.clone(),
            _ => None,
        }
    }
}

/// Receipt for a delivered message.
#[derive(Debug, Clone)]
pub struct MailReceipt {
    pub message_id: String,
}

/// Gmail REST client for the relay endpoint.
pub struct MailClient {
    token_url: String,
    send_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: Option<String>,
    sender: Option<String>,
    client: reqwest::Client,
}

impl MailClient {
    pub fn new(settings: &Settings) -> Self {
        Self::with_endpoints(GOOGLE_TOKEN_URL, GMAIL_SEND_URL, settings)
    }

    pub fn with_endpoints(token_url: &str, send_url: &str, settings: &Settings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            token_url: token_url.to_string(),
            send_url: send_url.to_string(),
            client_id: settings.google_client_id.clone(),
            client_secret: settings.google_client_secret.clone(),
            refresh_token: settings.google_refresh_token.clone(),
            sender: settings.gmail_sender_email.clone(),
            client,
        }
    }

    /// Send one HTML message. Exactly one token exchange and one send
    /// call; failures surface immediately.
    pub async fn send(
        &self,
        to: &str,
        subject: &str,
        content: &str,
    ) -> Result<MailReceipt, MailError> {
        let sender = self
            .sender
            .as_deref()
            .ok_or(MailError::MissingCredentials)?;
        let access_token = self.access_token().await?;

        let raw = encode_message(&build_mime(sender, to, subject, content));
        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(&access_token)
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await
            .map_err(|e| MailError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_send_failure(status.as_u16(), &body));
        }

        #[derive(Deserialize)]
        struct SendResponse {
            id: String,
        }
        let parsed: SendResponse = response.json().await.map_err(|e| MailError::Send {
            details: format!("Unreadable send response: {e}"),
            code: None,
            response: None,
        })?;

        tracing::info!(message_id = %parsed.id, "Email sent");
        Ok(MailReceipt {
            message_id: parsed.id,
        })
    }

    /// Exchange the refresh token for a short-lived access token.
    async fn access_token(&self) -> Result<String, MailError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(MailError::MissingCredentials);
        }
        let refresh_token = self
            .refresh_token
            .as_deref()
            .ok_or(MailError::MissingCredentials)?;

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| MailError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_send_failure(status.as_u16(), &body));
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }
        let parsed: TokenResponse = response.json().await.map_err(|e| MailError::Send {
            details: format!("Unreadable token response: {e}"),
            code: None,
            response: None,
        })?;
        Ok(parsed.access_token)
    }
}

/// Specialize a non-2xx upstream body by substring match.
fn classify_send_failure(status: u16, body: &str) -> MailError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let details = parsed
        .as_ref()
        .and_then(|v| {
            v.get("error_description")
                .or_else(|| v.pointer("/error/message"))
                .or_else(|| v.get("error"))
                .map(|m| match m.as_str() {
                    Some(s) => s.to_string(),
                    None => m.to_string(),
                })
        })
        .unwrap_or_else(|| body.to_string());

    if details.contains("unauthorized_client") || body.contains("unauthorized_client") {
        MailError::Unauthorized { details }
    } else if details.contains("invalid_grant") || body.contains("invalid_grant") {
        MailError::InvalidGrant { details }
    } else {
        MailError::Send {
            details,
            code: Some(status),
            response: parsed,
        }
    }
}

/// Assemble the MIME message the way the relay always has: UTF-8 HTML
/// body, subject encoded per RFC 2047.
pub fn build_mime(sender: &str, to: &str, subject: &str, content: &str) -> String {
    let utf8_subject = format!(
        "=?utf-8?B?{}?=",
        base64::engine::general_purpose::STANDARD.encode(subject)
    );
    [
        &format!("From: Marutham Care <{sender}>"),
        &format!("To: {to}"),
        "Content-Type: text/html; charset=utf-8",
        "MIME-Version: 1.0",
        &format!("Subject: {utf8_subject}"),
        "",
        content,
    ]
    .join("\n")
}

/// Gmail wants the raw message base64url-encoded without padding.
pub fn encode_message(mime: &str) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(mime)
}
