//! Admin authentication error types.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use crestline_core::UsernameError;
use crestline_core::auth::AuthErrorBody;
use thiserror::Error;

use super::password::PasswordError;
use crate::db::RepositoryError;

/// Message for a wrong username or password. Identical for both.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
/// Message while a username is locked.
pub const LOCKED_OUT: &str = "Too many failed login attempts. Please try again later.";

/// Errors that can occur during admin authentication operations.
#[derive(Debug, Error)]
pub enum AdminAuthError {
    /// Username or password missing or blank.
    #[error("username and password are required")]
    MissingCredentials,

    /// Username is not syntactically valid.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    /// Wrong username or password.
    #[error("invalid credentials")]
    InvalidCredentials { remaining_attempts: u32 },

    /// Too many failures; no password check was performed.
    #[error("locked until {locked_until}")]
    LockedOut { locked_until: DateTime<Utc> },

    /// No valid bearer token or cookie session.
    #[error("not authenticated")]
    Unauthenticated,

    /// Password hashing failed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl AdminAuthError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingCredentials | Self::InvalidUsername(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials { .. } | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::LockedOut { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Password(_) | Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> AuthErrorBody {
        match self {
            Self::MissingCredentials => AuthErrorBody::message("Username and password are required"),
            Self::InvalidUsername(_) => AuthErrorBody::message("Invalid username"),
            Self::InvalidCredentials { remaining_attempts } => AuthErrorBody {
                error: INVALID_CREDENTIALS.to_string(),
                remaining_attempts: Some(*remaining_attempts),
                locked_until: None,
            },
            Self::LockedOut { locked_until } => AuthErrorBody {
                error: LOCKED_OUT.to_string(),
                remaining_attempts: Some(0),
                locked_until: Some(*locked_until),
            },
            Self::Unauthenticated => AuthErrorBody::message("Not authenticated"),
            Self::Password(_) | Self::Repository(_) => {
                AuthErrorBody::message("Internal server error")
            }
        }
    }
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin auth error"
            );
        }

        let mut response = (status, Json(self.body())).into_response();

        if let Self::LockedOut { locked_until } = self {
            let secs = retry_after_secs(locked_until, Utc::now());
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// Whole seconds until `locked_until`, rounded up, at least 1.
fn retry_after_secs(locked_until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let remaining = locked_until - now;
    let secs = remaining.num_seconds() + i64::from(remaining.subsec_nanos() > 0);
    secs.max(1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    async fn body_of(response: Response) -> AuthErrorBody {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_credentials_reports_remaining_attempts() {
        let response = AdminAuthError::InvalidCredentials {
            remaining_attempts: 3,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());

        let body = body_of(response).await;
        assert_eq!(body.error, INVALID_CREDENTIALS);
        assert_eq!(body.remaining_attempts, Some(3));
        assert_eq!(body.locked_until, None);
    }

    #[tokio::test]
    async fn test_locked_out_sets_retry_after() {
        let locked_until = Utc::now() + TimeDelta::minutes(15);
        let response = AdminAuthError::LockedOut { locked_until }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let retry_after: i64 = response
            .headers()
            .get(header::RETRY_AFTER)
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((899..=900).contains(&retry_after));

        let body = body_of(response).await;
        assert_eq!(body.remaining_attempts, Some(0));
        assert_eq!(body.locked_until, Some(locked_until));
    }

    #[tokio::test]
    async fn test_repository_error_is_hidden() {
        let response =
            AdminAuthError::Repository(RepositoryError::DataCorruption("bad row 12".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await.error, "Internal server error");
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let now = Utc::now();
        assert_eq!(retry_after_secs(now + TimeDelta::milliseconds(1500), now), 2);
        assert_eq!(retry_after_secs(now + TimeDelta::seconds(900), now), 900);
        assert_eq!(retry_after_secs(now - TimeDelta::seconds(5), now), 1);
    }

    #[test]
    fn test_validation_errors_are_bad_request() {
        assert_eq!(
            AdminAuthError::MissingCredentials.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AdminAuthError::InvalidUsername(UsernameError::Empty).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
