//! Integration tests for Crestline.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process server tests (no database needed)
//! cargo test -p crestline-integration-tests
//!
//! # Including the PostgreSQL store tests
//! ADMIN_DATABASE_URL=postgres://... cargo test -p crestline-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `admin_login` - The real admin router on an ephemeral port, driven by the
//!   HTTP client, login guard and session bootstrap
//! - `admin_store_postgres` - Repositories against a live database

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::TimeDelta;
use crestline_admin::config::AdminConfig;
use crestline_admin::db::MemoryAdminStore;
use crestline_admin::routes;
use crestline_admin::services::auth::password::hash_password;
use crestline_admin::state::AppState;
use crestline_admin_client::{ClientConfig, HttpAuthApi};
use crestline_core::{AdminRole, LockoutPolicy, Permissions, Username};
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_sessions::MemoryStore;
use url::Url;

/// Username of the admin every [`TestServer`] starts with.
pub const ADMIN_USERNAME: &str = "jane";
/// Password of that admin.
pub const ADMIN_PASSWORD: &str = "correct horse battery";

/// Configuration for an in-process server. Nothing here touches a database.
#[must_use]
pub fn test_config() -> AdminConfig {
    AdminConfig {
        database_url: SecretString::from("postgres://localhost/unused"),
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        session_secret: SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%"),
        token_ttl: TimeDelta::hours(24),
        lockout: LockoutPolicy::default(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
        tls: None,
    }
}

/// The admin router served on an ephemeral localhost port.
///
/// Backed by [`MemoryAdminStore`] and an in-memory cookie session store.
/// The server task is aborted on drop.
pub struct TestServer {
    pub base_url: Url,
    pub store: Arc<MemoryAdminStore>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Start a server with one active editor, [`ADMIN_USERNAME`].
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn() -> Self {
        let store = Arc::new(MemoryAdminStore::new());
        store.add_admin(
            Username::parse(ADMIN_USERNAME).expect("valid username"),
            hash_password(ADMIN_PASSWORD).expect("hashable password"),
            AdminRole::Editor,
            ["blog:write"].into_iter().collect::<Permissions>(),
        );

        let state = AppState::new(test_config(), store.clone()).expect("valid token key");
        let app = routes::app(state, MemoryStore::default());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let task = tokio::spawn(async move {
            let _ = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await;
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}")).expect("valid url"),
            store,
            task,
        }
    }

    /// Client configuration pointing at this server.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url.clone())
    }

    /// An HTTP auth client for this server.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn api(&self) -> HttpAuthApi {
        HttpAuthApi::new(self.client_config()).expect("http client")
    }

    /// Absolute URL of `path` on this server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        self.client_config().endpoint(path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
