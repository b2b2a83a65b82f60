//! Storage seam used by the authentication flow.
//!
//! Handlers talk to an [`AdminStore`]; production wires in [`PgAdminStore`],
//! tests and local runs without a database use
//! [`MemoryAdminStore`](super::memory::MemoryAdminStore).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crestline_core::{AdminId, AdminSessionId, Username};
use secrecy::SecretString;
use sqlx::PgPool;

use super::{
    ActiveSession, ActivityLogRepository, AdminSessionRepository, AdminUserRepository,
    NewActivity, NewAdminSession, RepositoryError, RevokedSession,
};
use crate::models::AdminUser;

/// Persistence operations needed to log admins in and out.
#[async_trait]
pub trait AdminStore: Send + Sync {
    /// An active admin and its password hash, looked up case-insensitively.
    async fn find_login(
        &self,
        username: &Username,
    ) -> Result<Option<(AdminUser, SecretString)>, RepositoryError>;

    /// An admin by ID, if the account is still active.
    async fn find_active_admin(&self, id: AdminId) -> Result<Option<AdminUser>, RepositoryError>;

    /// Stamp a successful login.
    async fn record_login(&self, id: AdminId, at: DateTime<Utc>) -> Result<(), RepositoryError>;

    /// Store a newly issued bearer session.
    async fn create_session(
        &self,
        session: NewAdminSession<'_>,
    ) -> Result<AdminSessionId, RepositoryError>;

    /// The live session for a token digest, if its owner is still active.
    async fn find_session(
        &self,
        token_digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ActiveSession>, RepositoryError>;

    /// Revoke the session for a token digest.
    async fn revoke_session(
        &self,
        token_digest: &str,
    ) -> Result<Option<RevokedSession>, RepositoryError>;

    /// Append to the activity log.
    async fn record_activity(&self, entry: NewActivity<'_>) -> Result<(), RepositoryError>;

    /// Whether the backing store is reachable.
    async fn ping(&self) -> bool;
}

/// [`AdminStore`] backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgAdminStore {
    pool: PgPool,
}

impl PgAdminStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminStore for PgAdminStore {
    async fn find_login(
        &self,
        username: &Username,
    ) -> Result<Option<(AdminUser, SecretString)>, RepositoryError> {
        AdminUserRepository::new(&self.pool).get_login(username).await
    }

    async fn find_active_admin(&self, id: AdminId) -> Result<Option<AdminUser>, RepositoryError> {
        AdminUserRepository::new(&self.pool).get_active_by_id(id).await
    }

    async fn record_login(&self, id: AdminId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        AdminUserRepository::new(&self.pool).record_login(id, at).await
    }

    async fn create_session(
        &self,
        session: NewAdminSession<'_>,
    ) -> Result<AdminSessionId, RepositoryError> {
        AdminSessionRepository::new(&self.pool).create(session).await
    }

    async fn find_session(
        &self,
        token_digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ActiveSession>, RepositoryError> {
        AdminSessionRepository::new(&self.pool)
            .find_active(token_digest, now)
            .await
    }

    async fn revoke_session(
        &self,
        token_digest: &str,
    ) -> Result<Option<RevokedSession>, RepositoryError> {
        AdminSessionRepository::new(&self.pool)
            .revoke(token_digest)
            .await
    }

    async fn record_activity(&self, entry: NewActivity<'_>) -> Result<(), RepositoryError> {
        ActivityLogRepository::new(&self.pool).record(entry).await?;
        Ok(())
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
