//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a new admin
//! crestline admin create -u jane -f Jane -l Doe -r editor -p blog:write
//!
//! # Replace a password, deactivate an account
//! crestline admin set-password -u jane
//! crestline admin deactivate -u jane
//!
//! # Drop expired and revoked bearer sessions
//! crestline admin sessions purge
//!
//! # Override the lockout policy (read by the server on start-up)
//! crestline settings lockout --max-attempts 5 --minutes 15
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string for admin database
//! - `CRESTLINE_ADMIN_PASSWORD` - Password for `create` / `set-password`;
//!   read from stdin when unset

use chrono::Utc;
use crestline_admin::db::settings::{self, LOCKOUT_POLICY_KEY, LockoutSetting, SettingsError};
use crestline_admin::db::{
    ActivityAction, ActivityLogRepository, AdminSessionRepository, AdminUserRepository,
    NewActivity, NewAdminUser, RepositoryError,
};
use crestline_admin::services::auth::password::{PasswordError, hash_password, validate_password};
use crestline_core::{
    AdminRole, LockoutPolicy, LockoutPolicyError, Permissions, Username, UsernameError,
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Environment variable holding the password for non-interactive use.
pub const PASSWORD_ENV: &str = "CRESTLINE_ADMIN_PASSWORD";

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Settings error.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: super_admin, admin, editor")]
    InvalidRole(String),

    /// Invalid username.
    #[error("Invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    /// Password rejected or could not be hashed.
    #[error("Password: {0}")]
    Password(#[from] PasswordError),

    /// Lockout values out of range.
    #[error("Invalid lockout policy: {0}")]
    Lockout(#[from] LockoutPolicyError),

    /// Password could not be read from stdin.
    #[error("Failed to read password: {0}")]
    Input(#[from] std::io::Error),

    /// User already exists.
    #[error("Admin user already exists: {0}")]
    UserExists(String),

    /// No such user.
    #[error("Admin user not found: {0}")]
    NotFound(String),
}

/// Create a new admin user.
///
/// # Errors
///
/// Returns an error if the input is invalid, the username is taken or the
/// database operation fails.
pub async fn create_user(
    username: &str,
    first_name: &str,
    last_name: &str,
    role: &str,
    permissions: Vec<String>,
) -> Result<i32, AdminError> {
    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;
    let username = Username::parse(username)?;
    let permissions: Permissions = permissions.into_iter().collect();

    let password = read_password().await?;
    validate_password(password.expose_secret())?;
    let password_hash = hash_password(password.expose_secret())?;

    let pool = connect().await?;
    tracing::info!("Creating admin user: {} ({})", username, role);

    let admin = AdminUserRepository::new(&pool)
        .create(NewAdminUser {
            username: &username,
            password_hash: &password_hash,
            first_name: first_name.trim(),
            last_name: last_name.trim(),
            role,
            permissions: &permissions,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(username.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Username: {}, Role: {}",
        admin.id,
        admin.username,
        admin.role
    );

    Ok(admin.id.as_i32())
}

/// Replace an admin's password. Existing sessions stay valid.
///
/// # Errors
///
/// Returns an error if the password is rejected, the user does not exist or
/// the database operation fails.
pub async fn set_password(username: &str) -> Result<(), AdminError> {
    let username = Username::parse(username)?;

    let password = read_password().await?;
    validate_password(password.expose_secret())?;
    let password_hash = hash_password(password.expose_secret())?;

    let pool = connect().await?;
    AdminUserRepository::new(&pool)
        .set_password_hash(&username, &password_hash)
        .await
        .map_err(|e| not_found(e, &username))?;

    tracing::info!("Password updated for {}", username);
    Ok(())
}

/// Deactivate an admin and revoke all of their bearer sessions.
///
/// # Errors
///
/// Returns an error if the user does not exist or the database operation fails.
pub async fn deactivate(username: &str) -> Result<(), AdminError> {
    let username = Username::parse(username)?;

    let pool = connect().await?;
    let admin_id = AdminUserRepository::new(&pool)
        .deactivate(&username)
        .await
        .map_err(|e| not_found(e, &username))?;
    let revoked = AdminSessionRepository::new(&pool)
        .revoke_all_for(admin_id)
        .await?;
    ActivityLogRepository::new(&pool)
        .record(NewActivity {
            admin_id: Some(admin_id),
            username: username.as_str(),
            action: ActivityAction::SessionsRevoked,
            ip_address: None,
            details: serde_json::json!({ "revoked": revoked, "source": "cli" }),
        })
        .await?;

    tracing::info!("Deactivated {} ({} sessions revoked)", username, revoked);
    Ok(())
}

/// Delete expired and revoked bearer sessions.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn purge_sessions() -> Result<u64, AdminError> {
    let pool = connect().await?;
    let purged = AdminSessionRepository::new(&pool)
        .purge_stale(Utc::now())
        .await?;

    tracing::info!("Purged {} stale sessions", purged);
    Ok(purged)
}

/// Store a lockout policy override. The server picks it up on restart.
///
/// # Errors
///
/// Returns an error if the values are out of range or the database
/// operation fails.
pub async fn set_lockout(max_attempts: u32, minutes: i64) -> Result<(), AdminError> {
    let policy = LockoutPolicy::from_minutes(max_attempts, minutes)?;
    let setting = LockoutSetting {
        max_attempts: policy.max_attempts(),
        lockout_minutes: minutes,
    };
    let value = serde_json::to_value(setting).map_err(SettingsError::from)?;

    let pool = connect().await?;
    settings::set_setting(&pool, LOCKOUT_POLICY_KEY, &value).await?;

    tracing::info!(
        "Lockout policy set: {} attempts, {} minutes (restart the server to apply)",
        max_attempts,
        minutes
    );
    Ok(())
}

async fn connect() -> Result<PgPool, AdminError> {
    let database_url =
        super::database_url().ok_or(AdminError::MissingEnvVar("ADMIN_DATABASE_URL"))?;

    tracing::info!("Connecting to admin database...");
    Ok(crestline_admin::db::create_pool(&database_url).await?)
}

fn not_found(err: RepositoryError, username: &Username) -> AdminError {
    match err {
        RepositoryError::NotFound => AdminError::NotFound(username.to_string()),
        other => AdminError::Repository(other),
    }
}

/// Password from [`PASSWORD_ENV`], or the first line of stdin.
async fn read_password() -> Result<SecretString, std::io::Error> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(password));
    }

    tracing::info!("Enter password:");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(SecretString::from(
        line.trim_end_matches(['\r', '\n']).to_owned(),
    ))
}
