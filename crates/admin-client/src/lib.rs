//! Crestline admin client.
//!
//! Everything an admin front-end needs around the login form:
//!
//! - [`LoginGuard`] counts failed attempts, enforces the temporary lockout and
//!   never contacts the server while locked
//! - [`LockoutCountdown`] publishes the remaining lockout seconds once per second
//! - [`SessionContext`] owns the persisted session (`admin_token` / `admin_user`)
//! - [`bootstrap`] validates a stored session on start-up
//! - [`HttpAuthApi`] talks to the admin server
//!
//! The client-side counter is a UX affordance. The server throttle is
//! authoritative and the guard adopts whatever it reports.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod bootstrap;
pub mod clock;
pub mod config;
pub mod countdown;
pub mod error;
pub mod guard;
pub mod session;
pub mod storage;

pub use api::{AuthApi, HttpAuthApi};
pub use bootstrap::{BootstrapOutcome, bootstrap};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientConfig, ClientConfigError};
pub use countdown::LockoutCountdown;
pub use error::{ApiError, LoginError};
pub use guard::LoginGuard;
pub use session::{AdminSession, SessionContext};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};
