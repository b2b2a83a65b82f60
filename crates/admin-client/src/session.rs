//! The persisted admin session and its lifecycle.

use crestline_core::auth::{AdminProfile, AuthenticateResponse};
use secrecy::SecretString;
use tracing::{debug, warn};

use crate::api::AuthApi;
use crate::storage::{SessionStorage, StorageError};

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "admin_token";
/// Storage key holding the JSON admin profile.
pub const USER_KEY: &str = "admin_user";

/// An authenticated admin: bearer token plus profile.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub token: SecretString,
    pub admin: AdminProfile,
}

impl From<AuthenticateResponse> for AdminSession {
    fn from(response: AuthenticateResponse) -> Self {
        Self {
            token: SecretString::from(response.session_token),
            admin: response.admin,
        }
    }
}

/// Owns the current session and the storage it is persisted in.
///
/// Created with [`SessionContext::init`], which hydrates from storage; ended
/// with [`SessionContext::teardown`] or [`SessionContext::logout`].
#[derive(Debug)]
pub struct SessionContext<S> {
    storage: S,
    current: Option<AdminSession>,
}

impl<S: SessionStorage> SessionContext<S> {
    /// Hydrate from storage.
    ///
    /// Token and profile must both be present and readable; otherwise both
    /// keys are cleared and the context starts without a session.
    pub fn init(storage: S) -> Self {
        let mut context = Self {
            storage,
            current: None,
        };

        match context.read_stored() {
            Ok(Some(session)) => {
                debug!(username = %session.admin.username, "Restored stored admin session");
                context.current = Some(session);
            }
            Ok(None) => {
                if let Err(e) = context.clear_keys() {
                    warn!(error = %e, "Failed to clear partial session");
                }
            }
            Err(e) => {
                warn!(error = %e, "Stored session unreadable, discarding");
                if let Err(e) = context.clear_keys() {
                    warn!(error = %e, "Failed to clear unreadable session");
                }
            }
        }

        context
    }

    fn read_stored(&self) -> Result<Option<AdminSession>, StorageError> {
        let token = self.storage.get(TOKEN_KEY)?.filter(|t| !t.is_empty());
        let user = self.storage.get(USER_KEY)?;

        match (token, user) {
            (Some(token), Some(user)) => {
                let admin: AdminProfile = serde_json::from_str(&user)?;
                Ok(Some(AdminSession {
                    token: SecretString::from(token),
                    admin,
                }))
            }
            _ => Ok(None),
        }
    }

    /// Persist a freshly issued session and make it current.
    ///
    /// # Errors
    ///
    /// Returns an error if storage rejects the write. The session is not
    /// made current in that case.
    pub fn establish(&mut self, session: AdminSession) -> Result<(), StorageError> {
        use secrecy::ExposeSecret;

        let user = serde_json::to_string(&session.admin)?;
        self.storage
            .set(TOKEN_KEY, session.token.expose_secret().to_string())?;
        if let Err(e) = self.storage.set(USER_KEY, user) {
            let _ = self.storage.remove(TOKEN_KEY);
            return Err(e);
        }
        debug!(username = %session.admin.username, "Admin session established");
        self.current = Some(session);
        Ok(())
    }

    /// The current session, if any.
    #[must_use]
    pub const fn current(&self) -> Option<&AdminSession> {
        self.current.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    /// Forget the session and remove both storage keys.
    ///
    /// The in-memory session is dropped even if storage fails.
    ///
    /// # Errors
    ///
    /// Returns an error if storage rejects the removal.
    pub fn teardown(&mut self) -> Result<(), StorageError> {
        if let Some(session) = self.current.take() {
            debug!(username = %session.admin.username, "Admin session torn down");
        }
        self.clear_keys()
    }

    /// Tell the server to end the session (best effort), then tear down.
    ///
    /// # Errors
    ///
    /// Only storage failures are returned; a failed server call is logged.
    pub async fn logout<A: AuthApi + ?Sized>(&mut self, api: &A) -> Result<(), StorageError> {
        if let Some(session) = &self.current
            && let Err(e) = api.logout(&session.token).await
        {
            warn!(error = %e, "Server logout failed, clearing local session anyway");
        }
        self.teardown()
    }

    /// Borrow the underlying storage.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    fn clear_keys(&mut self) -> Result<(), StorageError> {
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(USER_KEY)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use crestline_core::auth::{AuthenticateRequest, SessionStatus};
    use crestline_core::{AdminId, AdminRole};
    use secrecy::ExposeSecret;

    use super::*;
    use crate::error::ApiError;
    use crate::storage::MemoryStorage;

    pub(crate) fn profile() -> AdminProfile {
        AdminProfile {
            id: AdminId::new(1),
            username: "jane".to_string(),
            role: AdminRole::Admin,
            permissions: ["blog:write"].into_iter().collect(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
        }
    }

    pub(crate) fn session() -> AdminSession {
        AdminSession {
            token: SecretString::from("tok_abc"),
            admin: profile(),
        }
    }

    #[derive(Default)]
    struct LogoutApi {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AuthApi for LogoutApi {
        async fn authenticate(
            &self,
            _request: &AuthenticateRequest,
        ) -> Result<crestline_core::auth::AuthenticateResponse, ApiError> {
            Err(ApiError::Timeout)
        }

        async fn check_session(&self, _token: &SecretString) -> Result<SessionStatus, ApiError> {
            Err(ApiError::Timeout)
        }

        async fn logout(&self, token: &SecretString) -> Result<(), ApiError> {
            assert_eq!(token.expose_secret(), "tok_abc");
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ApiError::Request("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_establish_persists_both_keys() {
        let mut context = SessionContext::init(MemoryStorage::new());
        context.establish(session()).unwrap();

        let storage = context.storage();
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("tok_abc"));
        let user: AdminProfile =
            serde_json::from_str(&storage.get(USER_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(user, profile());
    }

    #[test]
    fn test_init_restores_stored_session() {
        let mut context = SessionContext::init(MemoryStorage::new());
        context.establish(session()).unwrap();
        let storage = context.storage().clone();

        let restored = SessionContext::init(storage);
        let current = restored.current().unwrap();
        assert_eq!(current.token.expose_secret(), "tok_abc");
        assert_eq!(current.admin.username, "jane");
    }

    #[test]
    fn test_init_discards_token_without_profile() {
        let mut storage = MemoryStorage::new();
        storage.set(TOKEN_KEY, "tok_abc".to_string()).unwrap();

        let context = SessionContext::init(storage);
        assert!(!context.is_authenticated());
        assert!(context.storage().is_empty());
    }

    #[test]
    fn test_init_discards_unreadable_profile() {
        let mut storage = MemoryStorage::new();
        storage.set(TOKEN_KEY, "tok_abc".to_string()).unwrap();
        storage.set(USER_KEY, "{not json".to_string()).unwrap();

        let context = SessionContext::init(storage);
        assert!(!context.is_authenticated());
        assert!(context.storage().is_empty());
    }

    #[test]
    fn test_teardown_clears_storage() {
        let mut context = SessionContext::init(MemoryStorage::new());
        context.establish(session()).unwrap();
        context.teardown().unwrap();
        assert!(context.current().is_none());
        assert!(context.storage().is_empty());
    }

    #[tokio::test]
    async fn test_logout_calls_server_then_clears() {
        let api = LogoutApi::default();
        let mut context = SessionContext::init(MemoryStorage::new());
        context.establish(session()).unwrap();

        context.logout(&api).await.unwrap();
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        assert!(context.storage().is_empty());
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_server_fails() {
        let api = LogoutApi {
            fail: true,
            ..LogoutApi::default()
        };
        let mut context = SessionContext::init(MemoryStorage::new());
        context.establish(session()).unwrap();

        context.logout(&api).await.unwrap();
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        assert!(!context.is_authenticated());
        assert!(context.storage().is_empty());
    }

    #[tokio::test]
    async fn test_logout_without_session_skips_server() {
        let api = LogoutApi::default();
        let mut context = SessionContext::init(MemoryStorage::new());
        context.logout(&api).await.unwrap();
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }
}
