//! Admin user repository for database operations.
//!
//! Lookups by username are case-insensitive (`LOWER(username)` is uniquely
//! indexed).

use chrono::{DateTime, Utc};
use crestline_core::{AdminId, AdminRole, Permissions, Username};
use secrecy::SecretString;
use sqlx::PgPool;

use super::{RepositoryError, map_unique_violation};
use crate::models::AdminUser;

const ADMIN_USER_COLUMNS: &str = "id, username, first_name, last_name, role::text AS role, \
     permissions, is_active, last_login_at, created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` admin user queries.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct AdminUserRow {
    id: i32,
    username: String,
    first_name: String,
    last_name: String,
    role: String,
    permissions: Vec<String>,
    is_active: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AdminUserRow> for AdminUser {
    type Error = RepositoryError;

    fn try_from(row: AdminUserRow) -> Result<Self, Self::Error> {
        let username = Username::parse(&row.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;

        let role = row.role.parse::<AdminRole>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid role in database: {e}"))
        })?;

        Ok(Self {
            id: AdminId::new(row.id),
            username,
            first_name: row.first_name,
            last_name: row.last_name,
            role,
            permissions: row.permissions.into_iter().collect(),
            is_active: row.is_active,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AdminLoginRow {
    #[sqlx(flatten)]
    user: AdminUserRow,
    password_hash: String,
}

/// Fields for a new admin account.
#[derive(Debug)]
pub struct NewAdminUser<'a> {
    pub username: &'a Username,
    /// Argon2 PHC string.
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub role: AdminRole,
    pub permissions: &'a Permissions,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for admin user database operations.
pub struct AdminUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminUserRepository<'a> {
    /// Create a new admin user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an admin user by username (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<AdminUser>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(&format!(
            "SELECT {ADMIN_USER_COLUMNS} FROM admin.admin_user WHERE LOWER(username) = $1"
        ))
        .bind(username.normalized())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an active admin by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_active_by_id(&self, id: AdminId) -> Result<Option<AdminUser>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(&format!(
            "SELECT {ADMIN_USER_COLUMNS} FROM admin.admin_user WHERE id = $1 AND is_active"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an active admin together with its password hash, for login.
    ///
    /// Deactivated accounts are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_login(
        &self,
        username: &Username,
    ) -> Result<Option<(AdminUser, SecretString)>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminLoginRow>(&format!(
            "SELECT {ADMIN_USER_COLUMNS}, password_hash FROM admin.admin_user \
             WHERE LOWER(username) = $1 AND is_active"
        ))
        .bind(username.normalized())
        .fetch_optional(self.pool)
        .await?;

        row.map(|row| {
            let user = AdminUser::try_from(row.user)?;
            Ok((user, SecretString::from(row.password_hash)))
        })
        .transpose()
    }

    /// Create a new admin user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, new: NewAdminUser<'_>) -> Result<AdminUser, RepositoryError> {
        let row = sqlx::query_as::<_, AdminUserRow>(&format!(
            "INSERT INTO admin.admin_user \
                 (username, password_hash, first_name, last_name, role, permissions) \
             VALUES ($1, $2, $3, $4, $5::admin.admin_role, $6) \
             RETURNING {ADMIN_USER_COLUMNS}"
        ))
        .bind(new.username.as_str())
        .bind(new.password_hash)
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.role.as_str())
        .bind(new.permissions.clone().into_vec())
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "username already exists"))?;

        row.try_into()
    }

    /// Replace an admin's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no admin has that username.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_password_hash(
        &self,
        username: &Username,
        password_hash: &str,
    ) -> Result<AdminId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            "UPDATE admin.admin_user SET password_hash = $2, updated_at = NOW() \
             WHERE LOWER(username) = $1 RETURNING id",
        )
        .bind(username.normalized())
        .bind(password_hash)
        .fetch_optional(self.pool)
        .await?;

        id.map(AdminId::new).ok_or(RepositoryError::NotFound)
    }

    /// Deactivate an admin account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no admin has that username.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn deactivate(&self, username: &Username) -> Result<AdminId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            "UPDATE admin.admin_user SET is_active = FALSE, updated_at = NOW() \
             WHERE LOWER(username) = $1 RETURNING id",
        )
        .bind(username.normalized())
        .fetch_optional(self.pool)
        .await?;

        id.map(AdminId::new).ok_or(RepositoryError::NotFound)
    }

    /// Stamp a successful login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_login(&self, id: AdminId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE admin.admin_user SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
