//! Admin roles.

use serde::{Deserialize, Serialize};

/// Admin role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Full access, including admin account management.
    SuperAdmin,
    /// Manages site content, leads and settings.
    Admin,
    /// Edits blog posts, projects and testimonials only.
    Editor,
}

impl AdminRole {
    /// All roles, most privileged first.
    pub const ALL: [Self; 3] = [Self::SuperAdmin, Self::Admin, Self::Editor];

    /// Returns the canonical string form used in the database and on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Editor => "editor",
        }
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "editor" => Ok(Self::Editor),
            _ => Err(format!("invalid admin role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_and_display_agree() {
        for role in AdminRole::ALL {
            assert_eq!(role.to_string().parse::<AdminRole>().unwrap(), role);
        }
    }

    #[test]
    fn test_role_rejects_unknown() {
        assert!("viewer".parse::<AdminRole>().is_err());
    }

    #[test]
    fn test_role_serde_snake_case() {
        let json = serde_json::to_string(&AdminRole::SuperAdmin).unwrap();
        assert_eq!(json, "\"super_admin\"");
    }
}
