//! Session middleware for the protected routes.

use axum::extract::Request;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use axum::Extension;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};

/// Cookie set on sign-in and read back on every protected request.
pub const SESSION_COOKIE: &str = "marutham_session";

/// Extract the session token from `Authorization: Bearer …` or the
/// session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Reject unauthenticated requests and inject `UserContext` for the rest.
pub async fn require_session(
    Extension(ctx): Extension<ApiContext>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(request.headers()).ok_or(ApiError::Unauthorized)?;

    let user = ctx
        .sessions
        .lock()
        .map_err(|_| ApiError::Internal("session lock poisoned".into()))?
        .resolve(&token)
        .ok_or(ApiError::Unauthorized)?;

    request.extensions_mut().insert(UserContext { user });
    Ok(next.run(request).await)
}
