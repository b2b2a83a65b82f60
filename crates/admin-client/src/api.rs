//! Transport to the admin authentication endpoints.

use async_trait::async_trait;
use crestline_core::auth::{
    AuthErrorBody, AuthenticateRequest, AuthenticateResponse, LogoutResponse, SessionStatus, paths,
};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::error::ApiError;

/// The three calls the login flow makes.
///
/// Implemented over HTTP by [`HttpAuthApi`]; tests substitute an in-memory
/// fake to count calls and script responses.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /api/secure/admin/authenticate`.
    async fn authenticate(
        &self,
        request: &AuthenticateRequest,
    ) -> Result<AuthenticateResponse, ApiError>;

    /// `GET /api/secure/admin/session` with the bearer token.
    async fn check_session(&self, token: &SecretString) -> Result<SessionStatus, ApiError>;

    /// `POST /api/secure/admin/logout` with the bearer token.
    async fn logout(&self, token: &SecretString) -> Result<(), ApiError>;
}

/// [`AuthApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: Client,
    config: ClientConfig,
}

impl HttpAuthApi {
    /// Build a client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("crestline-admin-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    /// The configuration this client was built with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    #[instrument(skip(self, request), fields(username = %request.username))]
    async fn authenticate(
        &self,
        request: &AuthenticateRequest,
    ) -> Result<AuthenticateResponse, ApiError> {
        let response = self
            .client
            .post(self.config.endpoint(paths::AUTHENTICATE))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    #[instrument(skip_all)]
    async fn check_session(&self, token: &SecretString) -> Result<SessionStatus, ApiError> {
        let response = self
            .client
            .get(self.config.endpoint(paths::SESSION))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        decode(response).await
    }

    #[instrument(skip_all)]
    async fn logout(&self, token: &SecretString) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.config.endpoint(paths::LOGOUT))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        let body: LogoutResponse = decode(response).await?;
        debug!(success = body.success, "Logout acknowledged");
        Ok(())
    }
}

/// Decode a 2xx body as `T`, anything else as [`ApiError::Status`].
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(ApiError::from);
    }

    let bytes = response.bytes().await?;
    let body = serde_json::from_slice::<AuthErrorBody>(&bytes).ok();
    debug!(status = status.as_u16(), has_body = body.is_some(), "Non-success response");
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}
