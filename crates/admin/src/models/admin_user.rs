//! Admin user domain types.
//!
//! These types represent validated domain objects for admin authentication.

use chrono::{DateTime, Utc};
use crestline_core::auth::AdminProfile;
use crestline_core::{AdminId, AdminRole, Permissions, Username};

/// An admin user (domain type).
#[derive(Debug, Clone)]
pub struct AdminUser {
    /// Unique admin user ID.
    pub id: AdminId,
    /// Login name, unique case-insensitively.
    pub username: Username,
    pub first_name: String,
    pub last_name: String,
    /// Admin's role/permission level.
    pub role: AdminRole,
    /// Fine-grained permissions on top of the role.
    pub permissions: Permissions,
    /// Deactivated admins cannot log in and their sessions are rejected.
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    /// When the admin was created.
    pub created_at: DateTime<Utc>,
    /// When the admin was last updated.
    pub updated_at: DateTime<Utc>,
}

impl AdminUser {
    /// The public profile returned to clients.
    #[must_use]
    pub fn profile(&self) -> AdminProfile {
        AdminProfile {
            id: self.id,
            username: self.username.to_string(),
            role: self.role,
            permissions: self.permissions.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn admin() -> AdminUser {
        let now = Utc::now();
        AdminUser {
            id: AdminId::new(7),
            username: Username::parse("Jane.Doe").unwrap(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            role: AdminRole::Admin,
            permissions: ["blog:write", "leads:read"].into_iter().collect(),
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_profile_keeps_display_casing() {
        let profile = admin().profile();
        assert_eq!(profile.id, AdminId::new(7));
        assert_eq!(profile.username, "Jane.Doe");
        assert_eq!(profile.role, AdminRole::Admin);
        assert!(profile.permissions.contains("leads:read"));
        assert_eq!(profile.display_name(), "Jane Doe");
    }
}
