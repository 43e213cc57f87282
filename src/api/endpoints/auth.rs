//! Sign-in endpoints: provider redirect, callback, sign-out.

use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::middleware::auth::{session_token, SESSION_COOKIE};
use crate::api::types::ApiContext;

/// Where the browser lands after a completed sign-in.
const POST_SIGNIN_REDIRECT: &str = "/profile";

/// `GET /auth/signin` — redirect to the provider authorization URL.
pub async fn signin(State(ctx): State<ApiContext>) -> Result<Redirect, ApiError> {
    let state = ctx
        .sessions
        .lock()
        .map_err(|_| ApiError::Internal("session lock poisoned".into()))?
        .begin_signin();

    let url = ctx.oauth.authorize_url(&state);
    Ok(Redirect::temporary(&url))
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user denies access.
    pub error: Option<String>,
}

/// `GET /auth/callback` — complete the sign-in and set the session cookie.
pub async fn callback(
    State(ctx): State<ApiContext>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    if let Some(error) = query.error {
        return Err(ApiError::BadRequest(format!("Sign-in was denied: {error}")));
    }
    let code = query
        .code
        .ok_or_else(|| ApiError::BadRequest("Missing authorization code".into()))?;
    let state = query
        .state
        .ok_or_else(|| ApiError::BadRequest("Missing sign-in state".into()))?;

    {
        let mut sessions = ctx
            .sessions
            .lock()
            .map_err(|_| ApiError::Internal("session lock poisoned".into()))?;
        if !sessions.take_state(&state) {
            return Err(ApiError::BadRequest(
                "Sign-in state is unknown or expired".into(),
            ));
        }
    }

    let claims = ctx.oauth.exchange_code(&code).await?;
    tracing::info!(email = %claims.email, "User signed in");

    let token = ctx
        .sessions
        .lock()
        .map_err(|_| ApiError::Internal("session lock poisoned".into()))?
        .create(claims.into());

    let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Redirect::to(POST_SIGNIN_REDIRECT),
    )
        .into_response())
}

/// `POST /auth/signout` — invalidate the session and clear the cookie.
///
/// Always succeeds; signing out an absent session is a no-op.
pub async fn signout(State(ctx): State<ApiContext>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        if let Ok(mut sessions) = ctx.sessions.lock() {
            sessions.revoke(&token);
        }
    }

    let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0");
    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(serde_json::json!({ "success": true })),
    )
        .into_response()
}
