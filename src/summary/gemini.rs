//! Hosted completion API client.
//!
//! One request per summary: no streaming, no retry. The provider reports
//! errors as `{"error": {"message": …}}`; the message is classified into
//! the user-facing taxonomy by `classify_provider_message`.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{classify_provider_message, SummaryError};
use crate::config::Settings;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_MODEL: &str = "gemini-2.0-flash";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Generation parameters sent with every request.
const TEMPERATURE: f64 = 0.7;
const TOP_K: u32 = 40;
const TOP_P: f64 = 0.95;
const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Source of generated text. The production implementation calls the
/// hosted API; tests substitute `MockGenerator`.
pub trait TextGenerator: Send + Sync {
    fn generate(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, SummaryError>> + Send;
}

/// HTTP client for the completion endpoint.
pub struct GeminiClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(settings: &Settings) -> Self {
        Self::with_endpoint(GEMINI_BASE_URL, settings.gemini_api_key.clone())
    }

    pub fn with_endpoint(base_url: &str, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: GEMINI_MODEL.to_string(),
            client,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "topP")]
    top_p: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

impl TextGenerator for GeminiClient {
    fn generate(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, SummaryError>> + Send {
        async move {
            let api_key = self.api_key.as_ref().ok_or(SummaryError::MissingApiKey)?;
            let url = format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            );

            let body = GenerateRequest {
                contents: vec![Content {
                    parts: vec![Part { text: prompt }],
                }],
                generation_config: GenerationConfig {
                    temperature: TEMPERATURE,
                    top_k: TOP_K,
                    top_p: TOP_P,
                    max_output_tokens: MAX_OUTPUT_TOKENS,
                },
            };

            let response = self
                .client
                .post(&url)
                .query(&[("key", api_key.as_str())])
                .json(&body)
                .send()
                .await
                .map_err(|_| SummaryError::Network)?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ProviderErrorBody>(&text)
                    .map(|b| b.error.message)
                    .unwrap_or(text);
                return Err(classify_provider_message(&message));
            }

            let parsed: GenerateResponse = response
                .json()
                .await
                .map_err(|e| SummaryError::Provider(format!("Unreadable response: {e}")))?;

            let text: String = parsed
                .candidates
                .first()
                .map(|c| {
                    c.content
                        .parts
                        .iter()
                        .map(|p| p.text.as_str())
                        .collect::<Vec<_>>()
                        .join("")
                })
                .unwrap_or_default();

            if text.is_empty() {
                return Err(SummaryError::Provider(
                    "Provider returned no candidates".into(),
                ));
            }
            Ok(text)
        }
    }
}

/// Test generator — returns a configured response and records the last
/// prompt it was handed.
pub struct MockGenerator {
    response: Result<String, String>,
    last_prompt: Mutex<Option<String>>,
}

impl MockGenerator {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

impl TextGenerator for MockGenerator {
    fn generate(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, SummaryError>> + Send {
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }
        let response = self.response.clone();
        async move { response.map_err(|m| classify_provider_message(&m)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;

    async fn spawn_provider(status: axum::http::StatusCode, body: Value) -> String {
        let app = Router::new().route(
            "/models/:model",
            post(move |Json(req): Json<Value>| async move {
                // Echo assertion data back through a header-free channel:
                // the prompt must reach the provider body.
                assert!(req["contents"][0]["parts"][0]["text"].is_string());
                assert_eq!(req["generationConfig"]["temperature"], 0.7);
                assert_eq!(req["generationConfig"]["topK"], 40);
                assert_eq!(req["generationConfig"]["maxOutputTokens"], 1024);
                (status, Json(body.clone()))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn successful_generation_returns_candidate_text() {
        let base = spawn_provider(
            axum::http::StatusCode::OK,
            serde_json::json!({
                "candidates": [
                    {"content": {"parts": [{"text": "A calm "}, {"text": "narrative."}]}}
                ]
            }),
        )
        .await;
        let client = GeminiClient::with_endpoint(&base, Some("k".into()));

        let text = client.generate("history prompt").await.unwrap();
        assert_eq!(text, "A calm narrative.");
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = GeminiClient::with_endpoint("http://127.0.0.1:9", None);
        assert!(matches!(
            client.generate("prompt").await.unwrap_err(),
            SummaryError::MissingApiKey
        ));
    }

    #[tokio::test]
    async fn quota_error_is_classified() {
        let base = spawn_provider(
            axum::http::StatusCode::TOO_MANY_REQUESTS,
            serde_json::json!({
                "error": {"message": "Quota exceeded for requests per minute"}
            }),
        )
        .await;
        let client = GeminiClient::with_endpoint(&base, Some("k".into()));

        assert!(matches!(
            client.generate("prompt").await.unwrap_err(),
            SummaryError::QuotaExceeded
        ));
    }

    #[tokio::test]
    async fn empty_candidates_is_a_provider_error() {
        let base = spawn_provider(
            axum::http::StatusCode::OK,
            serde_json::json!({"candidates": []}),
        )
        .await;
        let client = GeminiClient::with_endpoint(&base, Some("k".into()));

        assert!(matches!(
            client.generate("prompt").await.unwrap_err(),
            SummaryError::Provider(_)
        ));
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            GeminiClient::with_endpoint(&format!("http://{addr}"), Some("k".into()));
        assert!(matches!(
            client.generate("prompt").await.unwrap_err(),
            SummaryError::Network
        ));
    }

    #[tokio::test]
    async fn mock_generator_records_prompt() {
        let generator = MockGenerator::new("ok");
        generator.generate("the prompt").await.unwrap();
        assert_eq!(generator.last_prompt().unwrap(), "the prompt");
    }
}
