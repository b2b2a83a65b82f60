//! Session-related types for admin authentication.
//!
//! Types stored in the cookie session for authentication state.

use crestline_core::auth::AdminProfile;
use crestline_core::{AdminId, AdminRole, Permissions};
use serde::{Deserialize, Serialize};

use super::admin_user::AdminUser;

/// Session-stored admin identity.
///
/// Minimal data stored in the session to identify the logged-in admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Admin's database ID.
    pub id: AdminId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Admin's role/permission level.
    pub role: AdminRole,
    #[serde(default)]
    pub permissions: Permissions,
}

impl CurrentAdmin {
    /// Profile returned by the cookie verify endpoint.
    #[must_use]
    pub fn profile(&self) -> AdminProfile {
        AdminProfile {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
            permissions: self.permissions.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

impl From<&AdminUser> for CurrentAdmin {
    fn from(admin: &AdminUser) -> Self {
        Self {
            id: admin.id,
            username: admin.username.to_string(),
            first_name: admin.first_name.clone(),
            last_name: admin.last_name.clone(),
            role: admin.role,
            permissions: admin.permissions.clone(),
        }
    }
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::admin_user::tests::admin;

    #[test]
    fn test_current_admin_round_trips_profile() {
        let user = admin();
        let current = CurrentAdmin::from(&user);
        assert_eq!(current.profile(), user.profile());
    }
}
