//! Admin permission sets.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A set of permission strings granted to an admin (e.g. `"blog:write"`).
///
/// Ordered so the serialized form is stable between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(BTreeSet<String>);

impl Permissions {
    /// Create an empty permission set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Returns `true` if the permission is granted.
    #[must_use]
    pub fn contains(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }

    /// Grant a permission. Blank entries are ignored.
    pub fn insert(&mut self, permission: impl Into<String>) {
        let permission = permission.into();
        let trimmed = permission.trim();
        if !trimmed.is_empty() {
            self.0.insert(trimmed.to_owned());
        }
    }

    /// Number of granted permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when nothing is granted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate permissions in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Convert to a vector (for `TEXT[]` columns).
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.0.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for Permissions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut permissions = Self::new();
        for permission in iter {
            permissions.insert(permission);
        }
        permissions
    }
}
