//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. Request ID (generate or propagate `x-request-id`)
//! 3. `TraceLayer` (request span carrying the request id)
//! 4. Session layer (tower-sessions, `PostgreSQL` store in production)
//! 5. Per-IP rate limit (authenticate route only)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{
    BearerToken, OptionalAdminAuth, RequireAdminAuth, clear_current_admin, set_current_admin,
};
pub use rate_limit::{ClientIpKeyExtractor, RateLimiterLayer, auth_rate_limiter, client_ip};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use session::{SESSION_COOKIE_NAME, create_session_layer, postgres_session_store};
