//! Wire types of the admin authentication API.
//!
//! All bodies use camelCase field names. Timestamps are RFC 3339.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AdminId, AdminRole, Permissions};

/// Endpoint paths, shared by the server router and the HTTP client.
pub mod paths {
    /// `POST` credentials, receive a session token.
    pub const AUTHENTICATE: &str = "/api/secure/admin/authenticate";
    /// `GET` with a bearer token, receive `{valid}`.
    pub const SESSION: &str = "/api/secure/admin/session";
    /// `POST` to end the current session.
    pub const LOGOUT: &str = "/api/secure/admin/logout";
    /// `GET` cookie-based session check used by route guards.
    pub const VERIFY: &str = "/api/admin/auth/verify";
}

/// Body of `POST /api/secure/admin/authenticate`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthenticateRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AuthenticateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticateRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Public profile of an authenticated admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub id: AdminId,
    pub username: String,
    pub role: AdminRole,
    #[serde(default)]
    pub permissions: Permissions,
    pub first_name: String,
    pub last_name: String,
}

impl AdminProfile {
    /// "First Last", falling back to the username when both are blank.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            self.username.clone()
        } else {
            name.to_owned()
        }
    }
}

/// Successful authentication.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateResponse {
    pub success: bool,
    pub session_token: String,
    pub admin: AdminProfile,
}

impl std::fmt::Debug for AuthenticateResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticateResponse")
            .field("success", &self.success)
            .field("session_token", &"[REDACTED]")
            .field("admin", &self.admin)
            .finish()
    }
}

/// Error payload returned by every endpoint.
///
/// The throttle fields are only present on authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_until: Option<DateTime<Utc>>,
}

impl AuthErrorBody {
    #[must_use]
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            remaining_attempts: None,
            locked_until: None,
        }
    }
}

/// Body of `GET /api/secure/admin/session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub valid: bool,
}

/// Body of `POST /api/secure/admin/logout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Body of a successful `GET /api/admin/auth/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub authenticated: bool,
    pub admin: AdminProfile,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn profile() -> AdminProfile {
        AdminProfile {
            id: AdminId::new(1),
            username: "jane".to_owned(),
            role: AdminRole::Admin,
            permissions: ["blog:write"].into_iter().collect(),
            first_name: "Jane".to_owned(),
            last_name: "Doe".to_owned(),
        }
    }

    #[test]
    fn test_profile_uses_camel_case() {
        let json = serde_json::to_value(profile()).unwrap();
        assert_eq!(json["firstName"], "Jane");
        assert_eq!(json["lastName"], "Doe");
        assert_eq!(json["role"], "admin");
        assert_eq!(json["permissions"][0], "blog:write");
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut admin = profile();
        assert_eq!(admin.display_name(), "Jane Doe");
        admin.first_name = " ".to_owned();
        admin.last_name = String::new();
        assert_eq!(admin.display_name(), "jane");
    }

    #[test]
    fn test_error_body_omits_absent_throttle_fields() {
        let json = serde_json::to_string(&AuthErrorBody::message("nope")).unwrap();
        assert_eq!(json, r#"{"error":"nope"}"#);
    }

    #[test]
    fn test_error_body_parses_lockout() {
        let body: AuthErrorBody = serde_json::from_str(
            r#"{"error":"locked","remainingAttempts":0,"lockedUntil":"2026-03-01T12:15:00Z"}"#,
        )
        .unwrap();
        assert_eq!(body.remaining_attempts, Some(0));
        assert!(body.locked_until.is_some());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let request = AuthenticateRequest {
            username: "jane".to_owned(),
            password: "hunter2hunter2".to_owned(),
        };
        assert!(!format!("{request:?}").contains("hunter2"));

        let response = AuthenticateResponse {
            success: true,
            session_token: "tok_secret".to_owned(),
            admin: profile(),
        };
        assert!(!format!("{response:?}").contains("tok_secret"));
    }
}
