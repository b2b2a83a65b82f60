//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AdminConfig;
use crate::db::AdminStore;
use crate::services::throttle::LoginThrottle;
use crate::services::token::{TokenKeyError, TokenSigner};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    store: Arc<dyn AdminStore>,
    throttle: LoginThrottle,
    signer: TokenSigner,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The throttle enforces `config.lockout`; callers that load an override
    /// from settings apply it to the config first.
    ///
    /// # Errors
    ///
    /// Returns an error if the session secret cannot key the token signer.
    pub fn new(config: AdminConfig, store: Arc<dyn AdminStore>) -> Result<Self, TokenKeyError> {
        let throttle = LoginThrottle::new(config.lockout);
        let signer = TokenSigner::new(&config.session_secret)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                throttle,
                signer,
            }),
        })
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the admin store.
    #[must_use]
    pub fn store(&self) -> &dyn AdminStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the per-username login throttle.
    #[must_use]
    pub fn throttle(&self) -> &LoginThrottle {
        &self.inner.throttle
    }

    /// Get a reference to the bearer token signer.
    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.inner.signer
    }
}
