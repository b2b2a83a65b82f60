//! Admin activity log.

use crestline_core::{ActivityLogId, AdminId};
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use super::RepositoryError;

/// Kinds of recorded activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    LoginSucceeded,
    LoginFailed,
    /// A failure that engaged (or hit) the lockout.
    LoginLocked,
    Logout,
    SessionsRevoked,
}

impl ActivityAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSucceeded => "login_succeeded",
            Self::LoginFailed => "login_failed",
            Self::LoginLocked => "login_locked",
            Self::Logout => "logout",
            Self::SessionsRevoked => "sessions_revoked",
        }
    }
}

impl std::fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A new activity log entry.
#[derive(Debug)]
pub struct NewActivity<'a> {
    /// `None` when the username did not match an account.
    pub admin_id: Option<AdminId>,
    /// As submitted, so failed logins against unknown names are still traceable.
    pub username: &'a str,
    pub action: ActivityAction,
    pub ip_address: Option<&'a str>,
    pub details: JsonValue,
}

/// Repository for the activity log.
pub struct ActivityLogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ActivityLogRepository<'a> {
    /// Create a new activity log repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(&self, entry: NewActivity<'_>) -> Result<ActivityLogId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO admin.activity_log (admin_user_id, username, action, ip_address, details) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(entry.admin_id)
        .bind(entry.username)
        .bind(entry.action.as_str())
        .bind(entry.ip_address)
        .bind(entry.details)
        .fetch_one(self.pool)
        .await?;

        Ok(ActivityLogId::new(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names() {
        assert_eq!(ActivityAction::LoginSucceeded.as_str(), "login_succeeded");
        assert_eq!(ActivityAction::LoginLocked.to_string(), "login_locked");
        assert_eq!(ActivityAction::Logout.as_str(), "logout");
    }
}
