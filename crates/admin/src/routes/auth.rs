//! Authentication route handlers for admin.
//!
//! The secure login API (authenticate, bearer session check, logout) and the
//! cookie-based verify endpoint used by route guards.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use crestline_core::auth::{
    AuthenticateRequest, AuthenticateResponse, LogoutResponse, SessionStatus, VerifyResponse,
};
use secrecy::ExposeSecret;
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::{BearerToken, OptionalAdminAuth, RequireAdminAuth, set_current_admin};
use crate::models::CurrentAdmin;
use crate::services::{AdminAuthService, ClientInfo};
use crate::state::AppState;

/// Check credentials and start a session.
///
/// POST /api/secure/admin/authenticate
#[instrument(skip_all)]
pub async fn authenticate(
    State(state): State<AppState>,
    session: Session,
    client: ClientInfo,
    payload: Result<Json<AuthenticateRequest>, JsonRejection>,
) -> Result<Json<AuthenticateResponse>, AppError> {
    let Json(request) = payload.map_err(|e| {
        warn!(error = %e, "Malformed authenticate request");
        AppError::BadRequest("Invalid request body".to_string())
    })?;

    let auth = AdminAuthService::new(&state)
        .authenticate(&request, &client, Utc::now())
        .await?;

    // New identity, new cookie session id
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to cycle session: {e}")))?;
    set_current_admin(&session, &CurrentAdmin::from(&auth.admin))
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store session: {e}")))?;

    set_sentry_user(auth.admin.id.as_i32(), auth.admin.username.as_str());

    Ok(Json(AuthenticateResponse {
        success: true,
        session_token: auth.token.expose_secret().to_owned(),
        admin: auth.admin.profile(),
    }))
}

/// Check a bearer token.
///
/// GET /api/secure/admin/session
pub async fn session(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<impl IntoResponse, AppError> {
    let active = match token {
        Some(token) => {
            AdminAuthService::new(&state)
                .verify_token(&token, Utc::now())
                .await?
        }
        None => None,
    };

    let status = if active.is_some() {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    };
    Ok((
        status,
        Json(SessionStatus {
            valid: active.is_some(),
        }),
    ))
}

/// End the current session. Always succeeds.
///
/// POST /api/secure/admin/logout
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    client: ClientInfo,
    BearerToken(token): BearerToken,
    OptionalAdminAuth(cookie_admin): OptionalAdminAuth,
) -> Json<LogoutResponse> {
    AdminAuthService::new(&state)
        .logout(
            token.as_ref(),
            cookie_admin.as_ref().map(|a| (a.id, a.username.as_str())),
            &client,
        )
        .await;

    if let Err(e) = session.flush().await {
        warn!(error = %e, "Failed to flush cookie session");
    }
    clear_sentry_user();

    Json(LogoutResponse { success: true })
}

/// Cookie session check for route guards.
///
/// GET /api/admin/auth/verify
pub async fn verify(RequireAdminAuth(admin): RequireAdminAuth) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        authenticated: true,
        admin: admin.profile(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, Response, header};
    use crestline_core::auth::{AuthErrorBody, paths};
    use crestline_core::{AdminRole, Permissions, Username};
    use serde::de::DeserializeOwned;
    use serde_json::json;
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::config::tests::test_config;
    use crate::db::MemoryAdminStore;
    use crate::routes::app;
    use crate::services::auth::password::hash_password;

    const PASSWORD: &str = "correct horse battery";

    fn test_app() -> Router {
        test_app_with_store().0
    }

    fn test_app_with_store() -> (Router, Arc<MemoryAdminStore>) {
        let store = Arc::new(MemoryAdminStore::new());
        store.add_admin(
            Username::parse("jane").unwrap(),
            hash_password(PASSWORD).unwrap(),
            AdminRole::Editor,
            ["blog:write"].into_iter().collect::<Permissions>(),
        );
        let state = crate::state::AppState::new(test_config(), store.clone()).unwrap();
        (app(state, MemoryStore::default()), store)
    }

    fn login(ip: &str, username: &str, password: &str) -> Request<Body> {
        Request::post(paths::AUTHENTICATE)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(
                json!({ "username": username, "password": password }).to_string(),
            ))
            .unwrap()
    }

    async fn json_body<T: DeserializeOwned>(response: Response<Body>) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn cookie(response: &Response<Body>) -> String {
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_login_returns_token_and_profile() {
        let app = test_app();

        let response = app.oneshot(login("10.0.0.1", "Jane", PASSWORD)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let body: AuthenticateResponse = json_body(response).await;
        assert!(body.success);
        assert_eq!(body.session_token.len(), 43);
        assert_eq!(body.admin.username, "jane");
        assert_eq!(body.admin.role, AdminRole::Editor);
    }

    #[tokio::test]
    async fn test_wrong_password_reports_remaining_then_locks() {
        let app = test_app();

        for (i, expected) in [4, 3, 2, 1].into_iter().enumerate() {
            let ip = format!("10.0.1.{i}");
            let response = app
                .clone()
                .oneshot(login(&ip, "jane", "wrong password"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            let body: AuthErrorBody = json_body(response).await;
            assert_eq!(body.error, "Invalid credentials");
            assert_eq!(body.remaining_attempts, Some(expected));
        }

        let response = app
            .clone()
            .oneshot(login("10.0.1.9", "jane", "wrong password"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        let body: AuthErrorBody = json_body(response).await;
        assert_eq!(body.remaining_attempts, Some(0));
        assert!(body.locked_until.is_some());

        // Correct password is refused while locked
        let response = app
            .oneshot(login("10.0.1.10", "jane", PASSWORD))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_per_ip_limit_answers_before_the_throttle() {
        let app = test_app();

        for i in 0..5 {
            let response = app
                .clone()
                .oneshot(login("10.0.2.1", &format!("ghost{i}"), "wrong password"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        let response = app
            .oneshot(login("10.0.2.1", "jane", PASSWORD))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(serde_json::from_slice::<AuthErrorBody>(&bytes).is_err());
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let request = Request::post(paths::AUTHENTICATE)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "10.0.3.1")
            .body(Body::from(r#"{"username":"jane"}"#))
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_session_check_and_logout() {
        let app = test_app();
        let response = app
            .clone()
            .oneshot(login("10.0.4.1", "jane", PASSWORD))
            .await
            .unwrap();
        let body: AuthenticateResponse = json_body(response).await;
        let bearer = format!("Bearer {}", body.session_token);

        let check = |bearer: String| {
            Request::get(paths::SESSION)
                .header(header::AUTHORIZATION, bearer)
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(check(bearer.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body::<SessionStatus>(response).await.valid);

        let logout = || {
            Request::post(paths::LOGOUT)
                .header(header::AUTHORIZATION, bearer.clone())
                .body(Body::empty())
                .unwrap()
        };
        for _ in 0..2 {
            let response = app.clone().oneshot(logout()).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(json_body::<LogoutResponse>(response).await.success);
        }

        let response = app.oneshot(check(bearer.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!json_body::<SessionStatus>(response).await.valid);
    }

    #[tokio::test]
    async fn test_session_without_token_is_invalid() {
        let request = Request::get(paths::SESSION).body(Body::empty()).unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cookie_verify_follows_login_and_logout() {
        let app = test_app();

        let verify = |cookie: Option<&str>| {
            let mut request = Request::get(paths::VERIFY);
            if let Some(cookie) = cookie {
                request = request.header(header::COOKIE, cookie);
            }
            request.body(Body::empty()).unwrap()
        };

        let response = app.clone().oneshot(verify(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(login("10.0.5.1", "jane", PASSWORD))
            .await
            .unwrap();
        let cookie = cookie(&response);

        let response = app.clone().oneshot(verify(Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: VerifyResponse = json_body(response).await;
        assert!(body.authenticated);
        assert_eq!(body.admin.username, "jane");

        let response = app
            .clone()
            .oneshot(
                Request::post(paths::LOGOUT)
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(verify(Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cookie_verify_rejects_deactivated_admin() {
        let (app, store) = test_app_with_store();

        let response = app
            .clone()
            .oneshot(login("10.0.6.1", "jane", PASSWORD))
            .await
            .unwrap();
        let cookie = cookie(&response);
        store.deactivate(&Username::parse("jane").unwrap());

        let verify = || {
            Request::get(paths::VERIFY)
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap()
        };
        let response = app.clone().oneshot(verify()).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // The stale identity is gone from the cookie session
        let response = app.oneshot(verify()).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
