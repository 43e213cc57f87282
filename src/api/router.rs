//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Session-protected routes carry the dashboard; the relay/proxy routes
//! and the sign-in flow are public. Middleware uses `Extension<ApiContext>`
//! (injected as the outermost layer); handlers use `State<ApiContext>`.

use axum::http::header::{self, HeaderValue};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the API router with all routes and middleware mounted.
pub fn api_router(ctx: ApiContext) -> Router {
    // Protected routes — require a live session.
    let protected = Router::new()
        .route("/api/dashboard", get(endpoints::dashboard::dashboard))
        .route("/api/profile", post(endpoints::profile::save))
        .route("/api/profile/history", get(endpoints::profile::history))
        .route("/api/visits", get(endpoints::profile::visits))
        .route("/api/analysis", post(endpoints::analysis::generate))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(
            middleware::auth::require_session,
        ))
        .layer(axum::Extension(ctx.clone()));

    // Public routes — sign-in flow plus the relay/proxy endpoints whose
    // contracts predate the session layer.
    let public = Router::new()
        .route("/api/health", get(endpoints::health::check))
        .route("/api/lifi", get(endpoints::lifi::proxy))
        .route("/api/send-email", post(endpoints::send_email::send))
        .route("/api/device-vitals", get(endpoints::vitals::snapshot))
        .route(
            "/api/device-vitals/refresh",
            post(endpoints::vitals::refresh),
        )
        .route(
            "/api/device-vitals/interval",
            put(endpoints::vitals::set_interval),
        )
        .route("/auth/signin", get(endpoints::auth::signin))
        .route("/auth/callback", get(endpoints::auth::callback))
        .route("/auth/signout", post(endpoints::auth::signout))
        .with_state(ctx.clone())
        .layer(axum::Extension(ctx));

    Router::new()
        .merge(protected)
        .merge(public)
        // Dashboard data is per-user and short-lived; never cache it.
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CorsLayer::permissive())
}
