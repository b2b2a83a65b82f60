//! Crestline Core - Shared types library.
//!
//! This crate provides common types used across all Crestline components:
//! - `admin` - Admin authentication server (session tokens, throttling)
//! - `admin-client` - Login guard and session handling for admin front-ends
//! - `cli` - Command-line tools for migrations and admin management
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and lets the client and
//! the server share the exact same lockout arithmetic.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, usernames, roles and permissions
//! - [`lockout`] - Lockout policy and per-login attempt state
//! - [`auth`] - Wire types and endpoint paths of the admin auth API

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod lockout;
pub mod types;

pub use lockout::{AttemptOutcome, LockoutPolicy, LockoutPolicyError, LoginAttemptState};
pub use types::*;
