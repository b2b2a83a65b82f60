//! In-memory [`AdminStore`] for tests and database-free local runs.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crestline_core::{AdminId, AdminRole, AdminSessionId, Permissions, Username};
use secrecy::SecretString;

use super::store::AdminStore;
use super::{
    ActiveSession, ActivityAction, NewActivity, NewAdminSession, RepositoryError, RevokedSession,
};
use crate::models::AdminUser;

/// One activity log entry as recorded by [`MemoryAdminStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub admin_id: Option<AdminId>,
    pub username: String,
    pub action: ActivityAction,
}

#[derive(Debug)]
struct StoredSession {
    id: AdminSessionId,
    admin_id: AdminId,
    token_digest: String,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

#[derive(Debug, Default)]
struct Inner {
    admins: Vec<(AdminUser, String)>,
    sessions: Vec<StoredSession>,
    activity: Vec<ActivityRecord>,
    next_id: i32,
}

impl Inner {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn admin(&self, id: AdminId) -> Option<&AdminUser> {
        self.admins
            .iter()
            .map(|(admin, _)| admin)
            .find(|admin| admin.id == id)
    }
}

/// Admin store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryAdminStore {
    inner: Mutex<Inner>,
}

impl MemoryAdminStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an active admin with an already-hashed password.
    pub fn add_admin(
        &self,
        username: Username,
        password_hash: impl Into<String>,
        role: AdminRole,
        permissions: Permissions,
    ) -> AdminUser {
        let mut inner = self.lock();
        let now = Utc::now();
        let admin = AdminUser {
            id: AdminId::new(inner.next_id()),
            first_name: username.to_string(),
            last_name: String::new(),
            username,
            role,
            permissions,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        inner.admins.push((admin.clone(), password_hash.into()));
        admin
    }

    /// Deactivate an admin. Returns `false` if the username is unknown.
    pub fn deactivate(&self, username: &Username) -> bool {
        let key = username.normalized();
        let mut inner = self.lock();
        let Some((admin, _)) = inner
            .admins
            .iter_mut()
            .find(|(admin, _)| admin.username.normalized() == key)
        else {
            return false;
        };
        admin.is_active = false;
        true
    }

    /// Snapshot of the activity log, oldest first.
    #[must_use]
    pub fn activity(&self) -> Vec<ActivityRecord> {
        self.lock().activity.clone()
    }

    /// The stored admin, including last-login stamps.
    #[must_use]
    pub fn admin(&self, username: &Username) -> Option<AdminUser> {
        let key = username.normalized();
        self.lock()
            .admins
            .iter()
            .map(|(admin, _)| admin)
            .find(|admin| admin.username.normalized() == key)
            .cloned()
    }

    /// Sessions that are neither revoked nor expired at `now`.
    #[must_use]
    pub fn live_sessions(&self, now: DateTime<Utc>) -> usize {
        self.lock()
            .sessions
            .iter()
            .filter(|s| !s.revoked && s.expires_at > now)
            .count()
    }
}

#[async_trait]
impl AdminStore for MemoryAdminStore {
    async fn find_login(
        &self,
        username: &Username,
    ) -> Result<Option<(AdminUser, SecretString)>, RepositoryError> {
        let key = username.normalized();
        Ok(self
            .lock()
            .admins
            .iter()
            .find(|(admin, _)| admin.is_active && admin.username.normalized() == key)
            .map(|(admin, hash)| (admin.clone(), SecretString::from(hash.clone()))))
    }

    async fn find_active_admin(&self, id: AdminId) -> Result<Option<AdminUser>, RepositoryError> {
        Ok(self.lock().admin(id).filter(|admin| admin.is_active).cloned())
    }

    async fn record_login(&self, id: AdminId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        let (admin, _) = inner
            .admins
            .iter_mut()
            .find(|(admin, _)| admin.id == id)
            .ok_or(RepositoryError::NotFound)?;
        admin.last_login_at = Some(at);
        Ok(())
    }

    async fn create_session(
        &self,
        session: NewAdminSession<'_>,
    ) -> Result<AdminSessionId, RepositoryError> {
        let mut inner = self.lock();
        if inner
            .sessions
            .iter()
            .any(|s| s.token_digest == session.token_digest)
        {
            return Err(RepositoryError::Conflict("duplicate token digest".to_string()));
        }
        let id = AdminSessionId::new(inner.next_id());
        inner.sessions.push(StoredSession {
            id,
            admin_id: session.admin_id,
            token_digest: session.token_digest.to_string(),
            expires_at: session.expires_at,
            revoked: false,
        });
        Ok(id)
    }

    async fn find_session(
        &self,
        token_digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ActiveSession>, RepositoryError> {
        let inner = self.lock();
        let Some(session) = inner
            .sessions
            .iter()
            .find(|s| s.token_digest == token_digest && !s.revoked && s.expires_at > now)
        else {
            return Ok(None);
        };

        Ok(inner
            .admin(session.admin_id)
            .filter(|admin| admin.is_active)
            .map(|admin| ActiveSession {
                id: session.id,
                expires_at: session.expires_at,
                admin: admin.clone(),
            }))
    }

    async fn revoke_session(
        &self,
        token_digest: &str,
    ) -> Result<Option<RevokedSession>, RepositoryError> {
        let mut inner = self.lock();
        let Some(session) = inner
            .sessions
            .iter_mut()
            .find(|s| s.token_digest == token_digest && !s.revoked)
        else {
            return Ok(None);
        };
        session.revoked = true;
        let admin_id = session.admin_id;

        Ok(inner.admin(admin_id).map(|admin| RevokedSession {
            admin_id,
            username: admin.username.to_string(),
        }))
    }

    async fn record_activity(&self, entry: NewActivity<'_>) -> Result<(), RepositoryError> {
        self.lock().activity.push(ActivityRecord {
            admin_id: entry.admin_id,
            username: entry.username.to_string(),
            action: entry.action,
        });
        Ok(())
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn username(s: &str) -> Username {
        Username::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_login_lookup_is_case_insensitive_and_skips_inactive() {
        let store = MemoryAdminStore::new();
        store.add_admin(username("Jane"), "hash", AdminRole::Admin, Permissions::new());

        let (admin, _) = store.find_login(&username("JANE")).await.unwrap().unwrap();
        assert_eq!(admin.username.as_str(), "Jane");

        assert!(store.deactivate(&username("jane")));
        assert!(store.find_login(&username("jane")).await.unwrap().is_none());
        assert!(!store.deactivate(&username("nobody")));
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = MemoryAdminStore::new();
        let admin = store.add_admin(username("jane"), "hash", AdminRole::Editor, Permissions::new());
        let now = Utc::now();

        store
            .create_session(NewAdminSession {
                admin_id: admin.id,
                token_digest: "abc",
                expires_at: now + TimeDelta::hours(1),
                ip_address: None,
                user_agent: None,
            })
            .await
            .unwrap();

        assert!(store.find_session("abc", now).await.unwrap().is_some());
        assert!(
            store
                .find_session("abc", now + TimeDelta::hours(2))
                .await
                .unwrap()
                .is_none()
        );

        let revoked = store.revoke_session("abc").await.unwrap().unwrap();
        assert_eq!(revoked.admin_id, admin.id);
        assert!(store.find_session("abc", now).await.unwrap().is_none());
        assert!(store.revoke_session("abc").await.unwrap().is_none());
    }
}
