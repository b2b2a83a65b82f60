//! Authentication extractors for admin.
//!
//! Cookie-session extractors for route guards, plus the bearer token and
//! client info extractors used by the secure login API.

use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use secrecy::SecretString;
use tower_sessions::Session;
use tracing::{info, warn};

use super::rate_limit::client_ip;
use crate::models::{CurrentAdmin, keys};
use crate::services::{AdminAuthError, ClientInfo};
use crate::state::AppState;

/// Extractor that requires a cookie session holding a [`CurrentAdmin`].
///
/// The admin is re-loaded from the store on every request, so a deactivated
/// account loses its cookie session at once. Rejects with 401 `{error}` when
/// there is no session or the account is no longer active.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdminAuth(admin): RequireAdminAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", admin.username)
/// }
/// ```
pub struct RequireAdminAuth(pub CurrentAdmin);

impl<S> FromRequestParts<S> for RequireAdminAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AdminAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(OptionalAdminAuth(admin)) = OptionalAdminAuth::from_request_parts(parts, state).await;
        let admin = admin.ok_or(AdminAuthError::Unauthenticated)?;

        let app_state = AppState::from_ref(state);
        match app_state.store().find_active_admin(admin.id).await? {
            Some(current) => Ok(Self(CurrentAdmin::from(&current))),
            None => {
                info!(admin_id = %admin.id, "Cookie session of inactive admin rejected");
                if let Some(session) = parts.extensions.get::<Session>()
                    && let Err(e) = clear_current_admin(session).await
                {
                    warn!(error = %e, "Failed to clear stale admin session");
                }
                Err(AdminAuthError::Unauthenticated)
            }
        }
    }
}

/// Extractor that optionally gets the current admin.
///
/// Unlike `RequireAdminAuth`, this does not reject the request if the admin is not logged in.
pub struct OptionalAdminAuth(pub Option<CurrentAdmin>);

impl<S> FromRequestParts<S> for OptionalAdminAuth
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentAdmin>(keys::CURRENT_ADMIN)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(admin))
    }
}

/// The `Authorization: Bearer <token>` credential, if present.
pub struct BearerToken(pub Option<SecretString>);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| SecretString::from(t.to_owned()));

        Ok(Self(token))
    }
}

/// Longest user agent kept for the session row and activity log.
const MAX_USER_AGENT_LEN: usize = 512;

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip_address = client_ip(&parts.headers, &parts.extensions).map(|ip| ip.to_string());
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|ua| ua.chars().take(MAX_USER_AGENT_LEN).collect());

        Ok(Self {
            ip_address,
            user_agent,
        })
    }
}

/// Helper to set the current admin in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CURRENT_ADMIN, admin).await
}

/// Helper to clear the current admin from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<CurrentAdmin>(keys::CURRENT_ADMIN).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;
    use secrecy::ExposeSecret;

    use super::*;

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[tokio::test]
    async fn test_bearer_token_is_parsed() {
        let mut parts = parts(
            Request::builder()
                .header("authorization", "Bearer abc123")
                .body(())
                .unwrap(),
        );
        let Ok(BearerToken(token)) = BearerToken::from_request_parts(&mut parts, &()).await;
        assert_eq!(token.unwrap().expose_secret(), "abc123");
    }

    #[tokio::test]
    async fn test_other_schemes_are_ignored() {
        for value in ["Basic dXNlcjpwYXNz", "Bearer ", "bearer abc"] {
            let mut parts = parts(
                Request::builder()
                    .header("authorization", value)
                    .body(())
                    .unwrap(),
            );
            let Ok(BearerToken(token)) = BearerToken::from_request_parts(&mut parts, &()).await;
            assert!(token.is_none(), "{value}");
        }
    }

    #[tokio::test]
    async fn test_client_info_reads_proxy_ip_and_user_agent() {
        let mut parts = parts(
            Request::builder()
                .header("x-forwarded-for", "203.0.113.7")
                .header("user-agent", "crestline/1.0")
                .body(())
                .unwrap(),
        );
        let Ok(info) = ClientInfo::from_request_parts(&mut parts, &()).await;
        assert_eq!(info.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(info.user_agent.as_deref(), Some("crestline/1.0"));
    }

    #[tokio::test]
    async fn test_require_admin_without_session_is_unauthenticated() {
        let state = AppState::new(
            crate::config::tests::test_config(),
            std::sync::Arc::new(crate::db::MemoryAdminStore::new()),
        )
        .unwrap();
        let mut parts = parts(Request::builder().body(()).unwrap());
        let result = RequireAdminAuth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AdminAuthError::Unauthenticated)));
    }
}
