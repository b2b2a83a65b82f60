//! Client-side errors.

use chrono::{DateTime, Utc};
use crestline_core::auth::AuthErrorBody;
use thiserror::Error;

/// Errors returned by an [`AuthApi`](crate::AuthApi) transport.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The server did not answer within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status.
    #[error("server returned {status}")]
    Status {
        status: u16,
        /// Parsed error payload, when the body was one.
        body: Option<AuthErrorBody>,
    },

    /// The response body could not be decoded.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Why a login submission did not produce a session.
///
/// Every variant is recoverable; render it with [`LoginError::user_message`].
#[derive(Debug, Error)]
pub enum LoginError {
    /// Too many failed attempts. Not retryable until the lock expires.
    #[error("login temporarily locked until {locked_until}")]
    LockedOut {
        locked_until: DateTime<Utc>,
        remaining_secs: u64,
    },

    /// Wrong username or password.
    #[error("invalid credentials ({remaining_attempts} attempts remaining)")]
    InvalidCredentials { remaining_attempts: u32 },

    /// Username or password left blank. Nothing was sent.
    #[error("username and password are required")]
    MissingCredentials,

    /// Network failure or unexpected server response. Does not use up an attempt.
    #[error("transport failure: {0}")]
    Transport(#[from] ApiError),

    /// Authenticated, but the session could not be persisted locally.
    #[error("could not persist session: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

impl LoginError {
    /// Message suitable for showing next to the login form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::LockedOut { remaining_secs, .. } => format!(
                "Too many failed login attempts. Try again in {}.",
                format_remaining(*remaining_secs)
            ),
            Self::InvalidCredentials {
                remaining_attempts: 1,
            } => "Invalid credentials. 1 attempt remaining.".to_string(),
            Self::InvalidCredentials { remaining_attempts } => {
                format!("Invalid credentials. {remaining_attempts} attempts remaining.")
            }
            Self::MissingCredentials => "Please enter your username and password.".to_string(),
            Self::Transport(_) => {
                "Unable to reach the server. Please check your connection and try again."
                    .to_string()
            }
            Self::Storage(_) => {
                "Signed in, but the session could not be saved on this device.".to_string()
            }
        }
    }

    /// Whether the user may submit again right away.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::LockedOut { .. })
    }
}

/// `m:ss` for the countdown display.
#[must_use]
pub fn format_remaining(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(900), "15:00");
        assert_eq!(format_remaining(400), "6:40");
        assert_eq!(format_remaining(5), "0:05");
    }

    #[test]
    fn test_invalid_credentials_message_counts_attempts() {
        let err = LoginError::InvalidCredentials {
            remaining_attempts: 3,
        };
        assert_eq!(err.user_message(), "Invalid credentials. 3 attempts remaining.");
        let err = LoginError::InvalidCredentials {
            remaining_attempts: 1,
        };
        assert_eq!(err.user_message(), "Invalid credentials. 1 attempt remaining.");
    }

    #[test]
    fn test_lockout_is_not_retryable() {
        let err = LoginError::LockedOut {
            locked_until: Utc::now(),
            remaining_secs: 400,
        };
        assert!(!err.is_retryable());
        assert!(err.user_message().contains("6:40"));
        assert!(LoginError::Transport(ApiError::Timeout).is_retryable());
    }
}
