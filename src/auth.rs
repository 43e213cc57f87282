//! Google sign-in and session management.
//!
//! The identity provider owns the sign-in flow; this module only builds
//! the authorization URL, exchanges the callback code for tokens, and
//! reads the identity claims. Sessions are held in memory: an opaque
//! bearer token maps (hashed) to the signed-in user until it expires.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use base64::Engine;
use serde::Deserialize;

use crate::config::Settings;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SIGNIN_SCOPES: &str = "openid email profile";

/// Sessions last 24 hours; sign-out revokes earlier.
const SESSION_TTL_SECS: u64 = 24 * 60 * 60;
/// Pending sign-in states are short-lived.
const STATE_TTL_SECS: u64 = 10 * 60;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Sign-in failed ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Identity token unreadable: {0}")]
    InvalidToken(String),
}

/// Identity claims read from the provider's `id_token`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserClaims {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// OAuth client for the sign-in flow.
pub struct OAuthClient {
    auth_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(settings: &Settings) -> Self {
        Self::with_endpoints(GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, settings)
    }

    pub fn with_endpoints(auth_url: &str, token_url: &str, settings: &Settings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            auth_url: auth_url.to_string(),
            token_url: token_url.to_string(),
            client_id: settings.google_client_id.clone(),
            client_secret: settings.google_client_secret.clone(),
            redirect_uri: settings.google_redirect_uri.clone(),
            client,
        }
    }

    /// Provider authorization URL for the browser redirect.
    pub fn authorize_url(&self, state: &str) -> String {
        let query = [
            ("response_type", "code"),
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", SIGNIN_SCOPES),
            ("state", state),
            ("access_type", "offline"),
        ]
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencode(v)))
        .collect::<Vec<_>>()
        .join("&");
        format!("{}?{}", self.auth_url, query)
    }

    /// Exchange the callback code for tokens and read the identity claims.
    pub async fn exchange_code(&self, code: &str) -> Result<UserClaims, AuthError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            id_token: String,
        }
        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        decode_id_token(&parsed.id_token)
    }
}

/// Read the claims from an `id_token`.
///
/// The token arrives over TLS directly from the token endpoint, so the
/// payload is read without re-verifying the provider's signature.
pub fn decode_id_token(id_token: &str) -> Result<UserClaims, AuthError> {
    let payload = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::InvalidToken("not a JWT".into()))?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
    let claims: UserClaims = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    if claims.email.trim().is_empty() {
        return Err(AuthError::InvalidToken("claims carry no email".into()));
    }
    Ok(claims)
}

// ═══════════════════════════════════════════════════════════
// Sessions
// ═══════════════════════════════════════════════════════════

/// The signed-in user, as injected into protected requests.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl From<UserClaims> for SessionUser {
    fn from(claims: UserClaims) -> Self {
        Self {
            email: claims.email,
            name: claims.name,
            picture: claims.picture,
        }
    }
}

struct Session {
    user: SessionUser,
    expires: Instant,
}

/// In-memory session and pending-state store.
pub struct SessionStore {
    sessions: HashMap<[u8; 32], Session>,
    pending_states: HashMap<String, Instant>,
    session_ttl: Duration,
    state_ttl: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttls(
            Duration::from_secs(SESSION_TTL_SECS),
            Duration::from_secs(STATE_TTL_SECS),
        )
    }

    pub fn with_ttls(session_ttl: Duration, state_ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            pending_states: HashMap::new(),
            session_ttl,
            state_ttl,
        }
    }

    /// Start a sign-in attempt; the returned state must come back on the
    /// callback.
    pub fn begin_signin(&mut self) -> String {
        self.cleanup();
        let state = uuid::Uuid::new_v4().to_string();
        self.pending_states
            .insert(state.clone(), Instant::now() + self.state_ttl);
        state
    }

    /// Consume a pending state. Single use; unknown or expired states fail.
    pub fn take_state(&mut self, state: &str) -> bool {
        match self.pending_states.remove(state) {
            Some(expires) => Instant::now() < expires,
            None => false,
        }
    }

    /// Create a session, returning the bearer token handed to the client.
    pub fn create(&mut self, user: SessionUser) -> String {
        self.cleanup();
        let token = generate_token();
        self.sessions.insert(
            hash_token(&token),
            Session {
                user,
                expires: Instant::now() + self.session_ttl,
            },
        );
        token
    }

    /// Resolve a token to its user, if the session is still live.
    pub fn resolve(&self, token: &str) -> Option<SessionUser> {
        let session = self.sessions.get(&hash_token(token))?;
        if Instant::now() < session.expires {
            Some(session.user.clone())
        } else {
            None
        }
    }

    pub fn revoke(&mut self, token: &str) {
        self.sessions.remove(&hash_token(token));
    }

    fn cleanup(&mut self) {
        let now = Instant::now();
        if self.sessions.len() > 1000 {
            self.sessions.retain(|_, s| now < s.expires);
        }
        if self.pending_states.len() > 1000 {
            self.pending_states.retain(|_, exp| now < *exp);
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate an opaque token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Tokens are stored hashed so a leaked store dump is not a session leak.
fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push_str("%20"),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
