//! Bearer session repository.
//!
//! Tokens are never stored. Each row holds the HMAC digest of a token, so a
//! leaked table cannot be replayed against the API.

use chrono::{DateTime, Utc};
use crestline_core::{AdminId, AdminSessionId};
use sqlx::PgPool;

use super::RepositoryError;
use super::admin_users::AdminUserRow;
use crate::models::AdminUser;

/// Fields for a newly issued session.
#[derive(Debug)]
pub struct NewAdminSession<'a> {
    pub admin_id: AdminId,
    /// Hex HMAC-SHA256 digest of the bearer token.
    pub token_digest: &'a str,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

/// A live session joined with its (active) owner.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub id: AdminSessionId,
    pub expires_at: DateTime<Utc>,
    pub admin: AdminUser,
}

/// Owner of a session that was just revoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokedSession {
    pub admin_id: AdminId,
    pub username: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ActiveSessionRow {
    session_id: i32,
    session_expires_at: DateTime<Utc>,
    #[sqlx(flatten)]
    admin: AdminUserRow,
}

/// Repository for bearer session database operations.
pub struct AdminSessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminSessionRepository<'a> {
    /// Create a new session repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new: NewAdminSession<'_>) -> Result<AdminSessionId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO admin.admin_session \
                 (admin_user_id, token_digest, expires_at, ip_address, user_agent) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(new.admin_id)
        .bind(new.token_digest)
        .bind(new.expires_at)
        .bind(new.ip_address)
        .bind(new.user_agent)
        .fetch_one(self.pool)
        .await?;

        Ok(AdminSessionId::new(id))
    }

    /// Find the unexpired, unrevoked session for a digest whose owner is
    /// still active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the owner row is invalid.
    pub async fn find_active(
        &self,
        token_digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ActiveSession>, RepositoryError> {
        let row = sqlx::query_as::<_, ActiveSessionRow>(
            "SELECT s.id AS session_id, s.expires_at AS session_expires_at, \
                    u.id, u.username, u.first_name, u.last_name, u.role::text AS role, \
                    u.permissions, u.is_active, u.last_login_at, u.created_at, u.updated_at \
             FROM admin.admin_session s \
             JOIN admin.admin_user u ON u.id = s.admin_user_id \
             WHERE s.token_digest = $1 \
               AND s.revoked_at IS NULL \
               AND s.expires_at > $2 \
               AND u.is_active",
        )
        .bind(token_digest)
        .bind(now)
        .fetch_optional(self.pool)
        .await?;

        row.map(|row| {
            Ok(ActiveSession {
                id: AdminSessionId::new(row.session_id),
                expires_at: row.session_expires_at,
                admin: AdminUser::try_from(row.admin)?,
            })
        })
        .transpose()
    }

    /// Revoke the session for a digest.
    ///
    /// Returns the owner when a live session was revoked, `None` if there
    /// was nothing to revoke.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn revoke(&self, token_digest: &str) -> Result<Option<RevokedSession>, RepositoryError> {
        let row = sqlx::query_as::<_, (i32, String)>(
            "UPDATE admin.admin_session s SET revoked_at = NOW() \
             FROM admin.admin_user u \
             WHERE u.id = s.admin_user_id \
               AND s.token_digest = $1 \
               AND s.revoked_at IS NULL \
             RETURNING s.admin_user_id, u.username",
        )
        .bind(token_digest)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(admin_id, username)| RevokedSession {
            admin_id: AdminId::new(admin_id),
            username,
        }))
    }

    /// Revoke every live session of an admin.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn revoke_all_for(&self, admin_id: AdminId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE admin.admin_session SET revoked_at = NOW() \
             WHERE admin_user_id = $1 AND revoked_at IS NULL",
        )
        .bind(admin_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete sessions that expired or were revoked before `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn purge_stale(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM admin.admin_session \
             WHERE expires_at <= $1 OR revoked_at IS NOT NULL",
        )
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
