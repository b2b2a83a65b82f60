//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Username/password login, bearer sessions, logout
//! - `throttle` - Per-username failed-login counter and lockout
//! - `token` - Bearer token generation and digests

pub mod auth;
pub mod throttle;
pub mod token;

pub use auth::{AdminAuthError, AdminAuthService, Authenticated, ClientInfo};
pub use throttle::{AttemptPermit, LoginThrottle, ThrottleStatus};
pub use token::{TokenSigner, generate_token};
