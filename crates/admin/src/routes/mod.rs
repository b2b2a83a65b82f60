//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (store ping)
//!
//! # Secure login API (bearer tokens)
//! POST /api/secure/admin/authenticate   - Username/password login (rate limited per IP)
//! GET  /api/secure/admin/session        - Bearer token check
//! POST /api/secure/admin/logout         - Revoke token and cookie session
//!
//! # Route guard (cookie session)
//! GET  /api/admin/auth/verify           - Current admin from the cookie session
//! ```

pub mod auth;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use crestline_core::auth::paths;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::SessionStore;
use tracing::Span;

use crate::middleware::{
    REQUEST_ID_HEADER, auth_rate_limiter, create_session_layer, request_id_middleware,
};
use crate::state::AppState;

/// Create the secure login API router.
pub fn auth_routes() -> Router<AppState> {
    let login = Router::new()
        .route(paths::AUTHENTICATE, post(auth::authenticate))
        .layer(auth_rate_limiter());

    Router::new()
        .merge(login)
        .route(paths::SESSION, get(auth::session))
        .route(paths::LOGOUT, post(auth::logout))
        .route(paths::VERIFY, get(auth::verify))
}

/// Create all routes for admin.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(auth_routes())
}

/// Build the full application: routes, cookie sessions, tracing and request ids.
///
/// Sentry layers are added by the binary on top of this.
pub fn app<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(session_store, state.config());

    routes()
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        // Outside the trace layer so the span sees the id
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.store().ping().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
