//! Crestline Admin library.
//!
//! This crate provides the admin authentication server as a library,
//! allowing it to be tested and reused.
//!
//! # Security
//!
//! This crate guards the admin area of the site:
//! - Username/password login with a per-username lockout
//! - Bearer session tokens (only HMAC digests are stored)
//! - Cookie sessions for route guards
//!
//! Passwords and tokens are never logged.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
