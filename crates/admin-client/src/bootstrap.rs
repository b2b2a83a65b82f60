//! Start-up check of a stored session.

use tracing::{debug, info, warn};

use crate::api::AuthApi;
use crate::session::{AdminSession, SessionContext};
use crate::storage::SessionStorage;

/// Where the front-end should go after start-up.
pub const DASHBOARD_PATH: &str = "/admin/dashboard";
/// The login form.
pub const LOGIN_PATH: &str = "/admin/login";

/// Result of [`bootstrap`].
#[derive(Debug, Clone)]
pub enum BootstrapOutcome {
    /// The stored token is still valid; go to the dashboard.
    Authenticated(AdminSession),
    /// No usable session; stay on the login view.
    Unauthenticated,
}

impl BootstrapOutcome {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// View to show next.
    #[must_use]
    pub const fn next_path(&self) -> &'static str {
        match self {
            Self::Authenticated(_) => DASHBOARD_PATH,
            Self::Unauthenticated => LOGIN_PATH,
        }
    }
}

/// Validate the stored session against the server.
///
/// Without a stored token no request is made. Any answer other than a
/// successful `{valid: true}` (network failure, error status, undecodable
/// body, `valid: false`) clears the stored session. There is no retry.
pub async fn bootstrap<S, A>(session: &mut SessionContext<S>, api: &A) -> BootstrapOutcome
where
    S: SessionStorage,
    A: AuthApi + ?Sized,
{
    let Some(current) = session.current().cloned() else {
        debug!("No stored admin session");
        return BootstrapOutcome::Unauthenticated;
    };

    match api.check_session(&current.token).await {
        Ok(status) if status.valid => {
            info!(username = %current.admin.username, "Stored admin session is valid");
            return BootstrapOutcome::Authenticated(current);
        }
        Ok(_) => debug!("Server reported stored session invalid"),
        Err(e) => debug!(error = %e, "Session check failed"),
    }

    if let Err(e) = session.teardown() {
        warn!(error = %e, "Failed to clear stale session");
    }
    BootstrapOutcome::Unauthenticated
}
