//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod session;

use secrecy::SecretString;

/// Read the admin database URL (`ADMIN_DATABASE_URL`, falling back to `DATABASE_URL`).
fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var("ADMIN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
