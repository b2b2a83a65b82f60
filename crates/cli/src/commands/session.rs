//! Admin session commands: login, status, logout.
//!
//! The session is persisted to `CRESTLINE_SESSION_FILE` (default
//! `.crestline/session.json`) under the `admin_token` / `admin_user` keys.
//!
//! # Usage
//!
//! ```bash
//! crestline login -u jane        # prompts for the password on stdin
//! crestline status
//! crestline logout
//! ```
//!
//! The attempt counter of `login` lasts for one invocation only; the admin
//! server keeps the authoritative per-username lockout.

use crestline_admin_client::{
    ApiError, AuthApi, BootstrapOutcome, ClientConfig, ClientConfigError, Clock, FileStorage,
    HttpAuthApi, LoginError, LoginGuard, SessionContext, StorageError, bootstrap,
};
use secrecy::SecretString;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use super::admin::PASSWORD_ENV;

/// Errors that can occur during session commands.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ClientConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{}", .0.user_message())]
    Login(#[from] LoginError),

    #[error("Failed to read password: {0}")]
    Input(#[from] std::io::Error),

    #[error("Login aborted")]
    Aborted,
}

fn open() -> Result<(SessionContext<FileStorage>, HttpAuthApi), SessionError> {
    let config = ClientConfig::from_env()?;
    let session = SessionContext::init(FileStorage::new(config.session_file.clone()));
    let api = HttpAuthApi::new(config)?;
    Ok((session, api))
}

/// Log in, reusing a stored session when the server still accepts it.
///
/// With `CRESTLINE_ADMIN_PASSWORD` set a single attempt is made. Otherwise
/// passwords are read from stdin, one per line, until the login succeeds or
/// input ends. While locked the command waits out the countdown.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the session cannot be
/// stored, or the login does not succeed.
pub async fn login(username: &str) -> Result<(), SessionError> {
    let (mut session, api) = open()?;

    if let BootstrapOutcome::Authenticated(current) = bootstrap(&mut session, &api).await {
        info!("Already logged in as {}", current.admin.display_name());
        return Ok(());
    }

    let mut guard = LoginGuard::new(api);

    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        let admin = guard
            .submit(&mut session, username, &SecretString::from(password))
            .await?;
        info!("Logged in as {} ({})", admin.admin.display_name(), admin.admin.role);
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        info!("Password for {}:", username);
        let Some(line) = lines.next_line().await? else {
            return Err(SessionError::Aborted);
        };

        match guard
            .submit(&mut session, username, &SecretString::from(line))
            .await
        {
            Ok(admin) => {
                info!("Logged in as {} ({})", admin.admin.display_name(), admin.admin.role);
                return Ok(());
            }
            Err(e @ LoginError::Storage(_)) => return Err(e.into()),
            Err(e @ LoginError::LockedOut { .. }) => {
                warn!("{}", e.user_message());
                wait_for_unlock(&guard).await;
            }
            Err(e) => warn!("{}", e.user_message()),
        }
    }
}

/// Follow the guard's countdown until the lock expires, reporting each minute.
async fn wait_for_unlock<A: AuthApi, C: Clock>(guard: &LoginGuard<A, C>) {
    let Some(countdown) = guard.countdown() else {
        return;
    };
    let mut rx = countdown.subscribe();
    loop {
        match *rx.borrow_and_update() {
            None => break,
            Some(secs) if secs % 60 == 0 => info!("Locked, {} minutes remaining", secs / 60),
            Some(_) => {}
        }
        if rx.changed().await.is_err() {
            break;
        }
    }
    info!("Lock expired, you may try again");
}

/// Report whether the stored session is still valid. An invalid session is cleared.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub async fn status() -> Result<(), SessionError> {
    let (mut session, api) = open()?;

    match bootstrap(&mut session, &api).await {
        BootstrapOutcome::Authenticated(current) => info!(
            "Logged in as {} ({}) at {}",
            current.admin.display_name(),
            current.admin.role,
            api.config().api_url
        ),
        BootstrapOutcome::Unauthenticated => info!("Not logged in"),
    }
    Ok(())
}

/// Log out on the server (best effort) and forget the stored session.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the session file
/// cannot be cleared.
pub async fn logout() -> Result<(), SessionError> {
    let (mut session, api) = open()?;

    if !session.is_authenticated() {
        info!("Not logged in");
        return Ok(());
    }

    session.logout(&api).await?;
    info!("Logged out");
    Ok(())
}
