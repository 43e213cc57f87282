use std::net::SocketAddr;

/// Application-level constants
pub const APP_NAME: &str = "Marutham Care";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> String {
    "marutham=info,tower_http=warn".to_string()
}

/// Default listen address when `MARUTHAM_BIND_ADDR` is not set.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8700";

/// Runtime settings, loaded once at startup and passed into every client.
///
/// Nothing in the crate reads the environment after construction — clients
/// that talk to Google, the hosted backend, the LLM API, or the sensor feed
/// are built from this struct and carried in shared state.
#[derive(Debug, Clone)]
pub struct Settings {
    /// OAuth client for sign-in and the sender mailbox.
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,
    /// Offline refresh token for the sender mailbox. Optional at boot;
    /// mail sending fails with a configuration error without it.
    pub google_refresh_token: Option<String>,
    /// Sender mailbox address for outgoing mail.
    pub gmail_sender_email: Option<String>,
    /// LLM completion API key. Optional at boot; the summary flow fails
    /// with a configuration error without it.
    pub gemini_api_key: Option<String>,
    /// Hosted relational backend: base URL + API key.
    pub backend_url: String,
    pub backend_api_key: String,
    /// Upstream sensor feed, proxied verbatim by `/api/lifi`.
    pub vitals_feed_url: String,
    /// Upstream device-vitals endpoint (normalized readings).
    pub device_vitals_url: String,
    /// Listen address for the HTTP server.
    pub bind_addr: SocketAddr,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },
}

impl Settings {
    /// Load settings from process environment variables.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary lookup function.
    ///
    /// `from_env` delegates here; tests pass a closure over a map instead
    /// of mutating the process environment.
    pub fn from_source(
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        let required = |var: &'static str| -> Result<String, SettingsError> {
            match get(var) {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => Err(SettingsError::MissingVar(var)),
            }
        };
        let optional = |var: &str| get(var).filter(|v| !v.trim().is_empty());

        let bind_raw = optional("MARUTHAM_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr =
            bind_raw.parse().map_err(|e: std::net::AddrParseError| {
                SettingsError::InvalidVar {
                    var: "MARUTHAM_BIND_ADDR",
                    reason: e.to_string(),
                }
            })?;

        let vitals_feed_url = required("VITALS_FEED_URL")?;
        // The device-vitals endpoint defaults to the raw feed when the
        // deployment exposes both shapes at one URL.
        let device_vitals_url =
            optional("DEVICE_VITALS_URL").unwrap_or_else(|| vitals_feed_url.clone());

        Ok(Settings {
            google_client_id: required("GOOGLE_CLIENT_ID")?,
            google_client_secret: required("GOOGLE_CLIENT_SECRET")?,
            google_redirect_uri: required("GOOGLE_REDIRECT_URI")?,
            google_refresh_token: optional("GOOGLE_REFRESH_TOKEN"),
            gmail_sender_email: optional("GMAIL_SENDER_EMAIL"),
            gemini_api_key: optional("GEMINI_API_KEY"),
            backend_url: required("BACKEND_URL")?,
            backend_api_key: required("BACKEND_API_KEY")?,
            vitals_feed_url,
            device_vitals_url,
            bind_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("GOOGLE_CLIENT_ID", "client-id"),
            ("GOOGLE_CLIENT_SECRET", "client-secret"),
            ("GOOGLE_REDIRECT_URI", "http://localhost:8700/auth/callback"),
            ("GOOGLE_REFRESH_TOKEN", "refresh-token"),
            ("GMAIL_SENDER_EMAIL", "care@marutham.example"),
            ("GEMINI_API_KEY", "gemini-key"),
            ("BACKEND_URL", "https://backend.example"),
            ("BACKEND_API_KEY", "backend-key"),
            ("VITALS_FEED_URL", "https://feed.example/data"),
        ])
    }

    fn settings_from(env: &HashMap<&'static str, &'static str>) -> Result<Settings, SettingsError> {
        Settings::from_source(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn loads_full_configuration() {
        let settings = settings_from(&full_env()).unwrap();
        assert_eq!(settings.google_client_id, "client-id");
        assert_eq!(settings.backend_url, "https://backend.example");
        assert_eq!(
            settings.gmail_sender_email.as_deref(),
            Some("care@marutham.example")
        );
        assert_eq!(settings.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
    }

    #[test]
    fn missing_backend_url_is_an_error() {
        let mut env = full_env();
        env.remove("BACKEND_URL");
        let err = settings_from(&env).unwrap_err();
        assert!(matches!(err, SettingsError::MissingVar("BACKEND_URL")));
    }

    #[test]
    fn blank_required_value_counts_as_missing() {
        let mut env = full_env();
        env.insert("GOOGLE_CLIENT_ID", "   ");
        let err = settings_from(&env).unwrap_err();
        assert!(matches!(err, SettingsError::MissingVar("GOOGLE_CLIENT_ID")));
    }

    #[test]
    fn optional_secrets_may_be_absent() {
        let mut env = full_env();
        env.remove("GEMINI_API_KEY");
        env.remove("GOOGLE_REFRESH_TOKEN");
        env.remove("GMAIL_SENDER_EMAIL");
        let settings = settings_from(&env).unwrap();
        assert!(settings.gemini_api_key.is_none());
        assert!(settings.google_refresh_token.is_none());
        assert!(settings.gmail_sender_email.is_none());
    }

    #[test]
    fn device_vitals_url_falls_back_to_feed_url() {
        let settings = settings_from(&full_env()).unwrap();
        assert_eq!(settings.device_vitals_url, settings.vitals_feed_url);

        let mut env = full_env();
        env.insert("DEVICE_VITALS_URL", "https://feed.example/vitals");
        let settings = settings_from(&env).unwrap();
        assert_eq!(settings.device_vitals_url, "https://feed.example/vitals");
    }

    #[test]
    fn invalid_bind_addr_is_rejected() {
        let mut env = full_env();
        env.insert("MARUTHAM_BIND_ADDR", "not-an-addr");
        let err = settings_from(&env).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::InvalidVar { var: "MARUTHAM_BIND_ADDR", .. }
        ));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
