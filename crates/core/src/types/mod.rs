//! Core types for Crestline.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod permission;
pub mod role;
pub mod username;

pub use id::*;
pub use permission::Permissions;
pub use role::AdminRole;
pub use username::{Username, UsernameError};
