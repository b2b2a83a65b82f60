//! Database operations for admin `PostgreSQL`.
//!
//! ## Tables (schema `admin`)
//!
//! - `admin_user` - Admin accounts (username, Argon2 hash, role, permissions)
//! - `admin_session` - Bearer sessions, stored as HMAC digests of the token
//! - `activity_log` - Login, logout and lockout events
//! - `system_setting` - Runtime settings (JSONB)
//! - `session` - Cookie sessions (managed by `tower-sessions`)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p crestline-cli -- migrate
//! ```

pub mod activity_log;
pub mod admin_sessions;
pub mod admin_users;
pub mod memory;
pub mod settings;
pub mod store;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use activity_log::{ActivityAction, ActivityLogRepository, NewActivity};
pub use admin_sessions::{ActiveSession, AdminSessionRepository, NewAdminSession, RevokedSession};
pub use admin_users::{AdminUserRepository, NewAdminUser};
pub use memory::MemoryAdminStore;
pub use store::{AdminStore, PgAdminStore};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate username).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
fn map_unique_violation(err: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_string());
    }
    RepositoryError::Database(err)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
