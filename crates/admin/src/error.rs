//! Unified error handling for the admin API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use crestline_core::auth::AuthErrorBody;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::AdminAuthError;

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication flow failed.
    #[error(transparent)]
    Auth(#[from] AdminAuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Auth failures carry their own status and body
        let err = match self {
            Self::Auth(err) => return err.into_response(),
            other => other,
        };

        let status = match &err {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Internal(_) | Self::Auth(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&err);
            tracing::error!(
                error = %err,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            err.to_string()
        };

        (status, Json(AuthErrorBody::message(message))).into_response()
    }
}

/// Set the Sentry user context from an admin user.
pub fn set_sentry_user(admin_id: i32, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("admin 7".to_string());
        assert_eq!(err.to_string(), "Not found: admin 7");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Auth(AdminAuthError::MissingCredentials)),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = AppError::Internal("pool exhausted on shard 3".to_string()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: AuthErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.error, "Internal server error");
    }
}
