//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `CRESTLINE_API_URL` - Admin server base URL (default: `http://127.0.0.1:3001`)
//! - `CRESTLINE_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `CRESTLINE_SESSION_FILE` - Where the session is persisted
//!   (default: `.crestline/session.json`)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://127.0.0.1:3001";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SESSION_FILE: &str = ".crestline/session.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ClientConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Admin client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Admin server base URL
    pub api_url: Url,
    /// Timeout applied to every request
    pub request_timeout: Duration,
    /// JSON file backing the persisted session
    pub session_file: PathBuf,
}

impl ClientConfig {
    /// Build a configuration for the given server with default timeout.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ClientConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ClientConfigError> {
        let _ = dotenvy::dotenv();

        let api_url = Url::parse(&get_env_or_default("CRESTLINE_API_URL", DEFAULT_API_URL))
            .map_err(|e| {
                ClientConfigError::InvalidEnvVar("CRESTLINE_API_URL".to_string(), e.to_string())
            })?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(ClientConfigError::InvalidEnvVar(
                "CRESTLINE_API_URL".to_string(),
                format!("unsupported scheme '{}'", api_url.scheme()),
            ));
        }

        let timeout_secs = get_env_or_default(
            "CRESTLINE_REQUEST_TIMEOUT_SECS",
            &DEFAULT_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .ok_or_else(|| {
            ClientConfigError::InvalidEnvVar(
                "CRESTLINE_REQUEST_TIMEOUT_SECS".to_string(),
                "must be a positive number of seconds".to_string(),
            )
        })?;

        let session_file =
            PathBuf::from(get_env_or_default("CRESTLINE_SESSION_FILE", DEFAULT_SESSION_FILE));

        Ok(Self {
            api_url,
            request_timeout: Duration::from_secs(timeout_secs),
            session_file,
        })
    }

    /// Absolute URL of an API path such as `/api/secure/admin/session`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
