//! Clients for the external sensor feed.
//!
//! Two upstream shapes: the raw feed (proxied verbatim by `/api/lifi`)
//! and the device-vitals endpoint, whose objects are validated into
//! `VitalsReading` before the panel trusts them.

use std::time::Duration;

use serde_json::Value;

use crate::config::Settings;
use crate::models::VitalsReading;

const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Feed error ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Malformed reading from feed: {0}")]
    InvalidReading(String),
}

/// HTTP client for the sensor feed upstreams.
#[derive(Clone)]
pub struct FeedClient {
    raw_url: String,
    vitals_url: String,
    client: reqwest::Client,
}

impl FeedClient {
    pub fn new(settings: &Settings) -> Self {
        Self::with_endpoints(&settings.vitals_feed_url, &settings.device_vitals_url)
    }

    pub fn with_endpoints(raw_url: &str, vitals_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            raw_url: raw_url.to_string(),
            vitals_url: vitals_url.to_string(),
            client,
        }
    }

    /// Fetch the raw feed body verbatim, for the proxy route.
    pub async fn fetch_raw(&self) -> Result<Value, FeedError> {
        let response = self.get(&self.raw_url).await?;
        response
            .json()
            .await
            .map_err(|e| FeedError::InvalidReading(e.to_string()))
    }

    /// Fetch and validate the device-vitals readings.
    ///
    /// A single malformed object fails the whole fetch: a feed that drops
    /// fields is a broken collaborator, not data to render.
    pub async fn list_vitals(&self) -> Result<Vec<VitalsReading>, FeedError> {
        let response = self.get(&self.vitals_url).await?;
        let readings: Vec<VitalsReading> = response
            .json()
            .await
            .map_err(|e| FeedError::InvalidReading(e.to_string()))?;

        for (index, reading) in readings.iter().enumerate() {
            if let Err(field) = reading.validate() {
                return Err(FeedError::InvalidReading(format!(
                    "reading {index}: invalid {field}"
                )));
            }
        }
        Ok(readings)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FeedError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FeedError::Network(format!(
                    "Feed request timed out after {REQUEST_TIMEOUT_SECS}s"
                ))
            } else {
                FeedError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FeedError::Upstream {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}
