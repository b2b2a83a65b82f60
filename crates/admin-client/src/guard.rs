//! Login attempt guard.
//!
//! Counts failed submissions and locks the form after too many of them.
//! While locked, [`LoginGuard::submit`] fails immediately and never reaches
//! the server.
//!
//! The counter lives in memory only, so restarting the client forgets it.
//! The server keeps its own per-username throttle and reports
//! `remainingAttempts` / `lockedUntil`; when it does, the guard adopts those
//! values instead of its own arithmetic.

use chrono::{DateTime, Utc};
use crestline_core::auth::{AuthErrorBody, AuthenticateRequest};
use crestline_core::{AttemptOutcome, LockoutPolicy, LoginAttemptState};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, instrument, warn};

use crate::api::AuthApi;
use crate::clock::{Clock, SystemClock};
use crate::countdown::LockoutCountdown;
use crate::error::{ApiError, LoginError};
use crate::session::{AdminSession, SessionContext};
use crate::storage::SessionStorage;

/// Guards the login form of one client.
///
/// `submit` takes `&mut self`, so a second submission cannot start while
/// one is in flight.
#[derive(Debug)]
pub struct LoginGuard<A, C = SystemClock> {
    api: A,
    clock: C,
    policy: LockoutPolicy,
    state: LoginAttemptState,
    countdown: Option<LockoutCountdown>,
}

impl<A: AuthApi> LoginGuard<A> {
    /// Guard with the default policy and the system clock.
    pub fn new(api: A) -> Self {
        Self::with_clock(api, SystemClock, LockoutPolicy::default())
    }
}

impl<A: AuthApi, C: Clock> LoginGuard<A, C> {
    pub fn with_clock(api: A, clock: C, policy: LockoutPolicy) -> Self {
        Self {
            api,
            clock,
            policy,
            state: LoginAttemptState::new(),
            countdown: None,
        }
    }

    /// Current attempt state.
    #[must_use]
    pub const fn state(&self) -> &LoginAttemptState {
        &self.state
    }

    #[must_use]
    pub const fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// The transport, e.g. for [`SessionContext::logout`].
    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Whether the form inputs should be enabled at `now`.
    #[must_use]
    pub fn can_submit(&self, now: DateTime<Utc>) -> bool {
        !self.state.is_locked(now)
    }

    /// Failures left before the lock engages.
    #[must_use]
    pub fn remaining_attempts(&self) -> u32 {
        self.state.remaining_attempts(&self.policy)
    }

    /// The running countdown, present only while locked.
    #[must_use]
    pub fn countdown(&self) -> Option<&LockoutCountdown> {
        self.countdown.as_ref().filter(|c| c.is_active())
    }

    /// Submit credentials.
    ///
    /// On success the session is persisted through `session` and returned.
    ///
    /// # Errors
    ///
    /// - [`LoginError::LockedOut`] while locked (no request is made) or when
    ///   this failure reached the threshold
    /// - [`LoginError::InvalidCredentials`] with the remaining budget
    /// - [`LoginError::MissingCredentials`] for blank input (no request, no attempt used)
    /// - [`LoginError::Transport`] for network failures (no attempt used)
    /// - [`LoginError::Storage`] if the session could not be persisted
    #[instrument(skip(self, password, session), fields(username = %username))]
    pub async fn submit<S: SessionStorage>(
        &mut self,
        session: &mut SessionContext<S>,
        username: &str,
        password: &SecretString,
    ) -> Result<AdminSession, LoginError> {
        let now = self.clock.now();

        if let Some(err) = self.locked_error(now) {
            debug!("Submission rejected locally, login is locked");
            return Err(err);
        }
        if self.state.release_expired(now) {
            debug!("Lockout expired, attempt budget restored");
            self.countdown = None;
        }

        let username = username.trim();
        if username.is_empty() || password.expose_secret().is_empty() {
            return Err(LoginError::MissingCredentials);
        }

        let request = AuthenticateRequest {
            username: username.to_string(),
            password: password.expose_secret().to_string(),
        };

        let result = self.api.authenticate(&request).await;
        match result {
            Ok(response) if response.success => {
                self.state.record_success();
                self.countdown = None;
                let admin_session = AdminSession::from(response);
                session.establish(admin_session.clone())?;
                info!("Admin login succeeded");
                Ok(admin_session)
            }
            Ok(_) => Err(self.on_rejected(None)),
            Err(ApiError::Status { status, body }) if is_rejection(status, body.as_ref()) => {
                Err(self.on_rejected(body.as_ref()))
            }
            Err(e) => {
                warn!(error = %e, "Login request failed, attempt not counted");
                Err(LoginError::Transport(e))
            }
        }
    }

    fn on_rejected(&mut self, body: Option<&AuthErrorBody>) -> LoginError {
        let now = self.clock.now();

        let adopted = body.is_some_and(|body| {
            self.state
                .adopt(&self.policy, body.remaining_attempts, body.locked_until, now)
        });
        if adopted {
            self.state.release_expired(now);
        } else if let AttemptOutcome::Locked { until } = self.state.record_failure(&self.policy, now)
        {
            debug!(%until, "Local attempt budget exhausted");
        }

        if let Some(err) = self.locked_error(now) {
            warn!("Login locked after repeated failures");
            if let Some(remaining) = self.state.remaining_lockout(now)
                && let Ok(remaining) = remaining.to_std()
            {
                self.countdown = Some(LockoutCountdown::start(remaining));
            }
            return err;
        }

        LoginError::InvalidCredentials {
            remaining_attempts: self.remaining_attempts(),
        }
    }

    fn locked_error(&self, now: DateTime<Utc>) -> Option<LoginError> {
        let locked_until = self.state.locked_until?;
        let remaining_secs = self.state.remaining_lockout_secs(now)?;
        Some(LoginError::LockedOut {
            locked_until,
            remaining_secs,
        })
    }
}

/// Whether an error status means "credentials refused" rather than "server trouble".
///
/// A 429 only counts when it carries the throttle body; the per-IP request
/// limiter answers 429 with plain text, which is not a credential verdict.
const fn is_rejection(status: u16, body: Option<&AuthErrorBody>) -> bool {
    match status {
        401 => true,
        429 => body.is_some(),
        _ => false,
    }
}
