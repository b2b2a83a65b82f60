//! Admin authentication service.
//!
//! Username/password login guarded by the per-username [`LoginThrottle`],
//! bearer session issue and verification, and logout.
//!
//! # Login flow
//!
//! 1. Reject blank or malformed input.
//! 2. If the username is locked, reject without touching the password.
//! 3. Verify the Argon2 hash. Unknown usernames run a dummy verification and
//!    count against the throttle like any other failure.
//! 4. On failure, report the remaining attempts or the lock expiry.
//! 5. On success, clear the throttle and issue a bearer token; only its HMAC
//!    digest is stored.

mod error;
pub mod password;

pub use error::{AdminAuthError, INVALID_CREDENTIALS, LOCKED_OUT};

use chrono::{DateTime, TimeDelta, Utc};
use crestline_core::auth::AuthenticateRequest;
use crestline_core::{AdminId, AttemptOutcome, Username};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{info, warn};

use super::throttle::{LoginThrottle, ThrottleStatus};
use super::token::{TokenSigner, generate_token};
use crate::db::{ActiveSession, ActivityAction, AdminStore, NewActivity, NewAdminSession};
use crate::models::AdminUser;
use crate::state::AppState;

/// Where a request came from, for the session row and activity log.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// A freshly authenticated admin.
#[derive(Debug)]
pub struct Authenticated {
    pub token: SecretString,
    pub admin: AdminUser,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service.
pub struct AdminAuthService<'a> {
    store: &'a dyn AdminStore,
    throttle: &'a LoginThrottle,
    signer: &'a TokenSigner,
    token_ttl: TimeDelta,
}

impl<'a> AdminAuthService<'a> {
    /// Create a new authentication service over the shared state.
    #[must_use]
    pub fn new(state: &'a AppState) -> Self {
        Self {
            store: state.store(),
            throttle: state.throttle(),
            signer: state.signer(),
            token_ttl: state.config().token_ttl,
        }
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Check credentials and issue a session token.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::MissingCredentials` or `InvalidUsername` for bad input.
    /// Returns `AdminAuthError::LockedOut` while the username is locked, or when this
    /// failure engaged the lock.
    /// Returns `AdminAuthError::InvalidCredentials` with the remaining budget otherwise.
    /// Returns `AdminAuthError::Repository` if the store fails.
    pub async fn authenticate(
        &self,
        request: &AuthenticateRequest,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Result<Authenticated, AdminAuthError> {
        if request.username.trim().is_empty() || request.password.is_empty() {
            return Err(AdminAuthError::MissingCredentials);
        }
        let username = Username::parse(&request.username)?;
        let key = username.normalized();

        // Held until the outcome is recorded, so concurrent guesses for one
        // username are verified one at a time.
        let mut permit = self.throttle.acquire(&key).await;
        if let ThrottleStatus::Locked { until } = permit.status(now) {
            warn!(username = %key, %until, "Login attempt while locked");
            return Err(AdminAuthError::LockedOut {
                locked_until: until,
            });
        }

        let admin = match self.store.find_login(&username).await? {
            Some((admin, hash)) => {
                password::verify_password(&request.password, hash.expose_secret()).then_some(admin)
            }
            None => {
                password::dummy_verify(&request.password);
                None
            }
        };

        let Some(admin) = admin else {
            let outcome = permit.record_failure(now);
            drop(permit);
            return Err(self.reject(&username, outcome, client).await);
        };

        permit.record_success();
        drop(permit);
        let authenticated = self.issue_session(admin, client, now).await?;

        info!(
            admin_id = %authenticated.admin.id,
            username = %authenticated.admin.username,
            "Admin logged in"
        );
        self.log_activity(NewActivity {
            admin_id: Some(authenticated.admin.id),
            username: authenticated.admin.username.as_str(),
            action: ActivityAction::LoginSucceeded,
            ip_address: client.ip_address.as_deref(),
            details: json!({}),
        })
        .await;

        Ok(authenticated)
    }

    /// Log a counted failure and build the error to return.
    async fn reject(
        &self,
        username: &Username,
        outcome: AttemptOutcome,
        client: &ClientInfo,
    ) -> AdminAuthError {
        let key = username.normalized();

        let (action, details, error) = match outcome {
            AttemptOutcome::Remaining { remaining_attempts } => (
                ActivityAction::LoginFailed,
                json!({ "remainingAttempts": remaining_attempts }),
                AdminAuthError::InvalidCredentials { remaining_attempts },
            ),
            AttemptOutcome::Locked { until } => (
                ActivityAction::LoginLocked,
                json!({ "lockedUntil": until }),
                AdminAuthError::LockedOut {
                    locked_until: until,
                },
            ),
        };

        warn!(username = %key, %action, "Admin login failed");
        let admin_id = self.known_admin_id(username).await;
        self.log_activity(NewActivity {
            admin_id,
            username: username.as_str(),
            action,
            ip_address: client.ip_address.as_deref(),
            details,
        })
        .await;

        error
    }

    /// Id of the account a failed login targeted, if it exists and is active.
    async fn known_admin_id(&self, username: &Username) -> Option<AdminId> {
        match self.store.find_login(username).await {
            Ok(found) => found.map(|(admin, _)| admin.id),
            Err(e) => {
                warn!(error = %e, "Failed to resolve admin for activity log");
                None
            }
        }
    }

    async fn issue_session(
        &self,
        admin: AdminUser,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Result<Authenticated, AdminAuthError> {
        let token = generate_token();
        let digest = self.signer.digest(token.expose_secret());
        let expires_at = now + self.token_ttl;

        self.store
            .create_session(NewAdminSession {
                admin_id: admin.id,
                token_digest: &digest,
                expires_at,
                ip_address: client.ip_address.as_deref(),
                user_agent: client.user_agent.as_deref(),
            })
            .await?;
        self.store.record_login(admin.id, now).await?;

        Ok(Authenticated {
            token,
            admin,
            expires_at,
        })
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// The live session a bearer token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::Repository` if the store fails.
    pub async fn verify_token(
        &self,
        token: &SecretString,
        now: DateTime<Utc>,
    ) -> Result<Option<ActiveSession>, AdminAuthError> {
        let token = token.expose_secret();
        if token.is_empty() {
            return Ok(None);
        }
        let digest = self.signer.digest(token);
        Ok(self.store.find_session(&digest, now).await?)
    }

    /// Revoke the bearer token's session, if any, and log the logout.
    ///
    /// Never fails: logout is idempotent and store errors are only logged.
    /// `cookie_admin` names the admin when only a cookie session was present.
    pub async fn logout(
        &self,
        token: Option<&SecretString>,
        cookie_admin: Option<(AdminId, &str)>,
        client: &ClientInfo,
    ) {
        let revoked = match token {
            Some(token) => {
                let digest = self.signer.digest(token.expose_secret());
                match self.store.revoke_session(&digest).await {
                    Ok(revoked) => revoked,
                    Err(e) => {
                        warn!(error = %e, "Failed to revoke admin session");
                        None
                    }
                }
            }
            None => None,
        };

        let who = revoked
            .as_ref()
            .map(|r| (r.admin_id, r.username.as_str()))
            .or(cookie_admin);

        if let Some((admin_id, username)) = who {
            info!(%admin_id, %username, "Admin logged out");
            self.log_activity(NewActivity {
                admin_id: Some(admin_id),
                username,
                action: ActivityAction::Logout,
                ip_address: client.ip_address.as_deref(),
                details: json!({ "tokenRevoked": revoked.is_some() }),
            })
            .await;
        }
    }

    /// Activity logging is best effort; a failure never fails the request.
    async fn log_activity(&self, entry: NewActivity<'_>) {
        let action = entry.action;
        if let Err(e) = self.store.record_activity(entry).await {
            warn!(error = %e, %action, "Failed to write activity log");
        }
    }
}
