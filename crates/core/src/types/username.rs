//! Admin username type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Username`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    /// The input is empty after trimming.
    #[error("username cannot be empty")]
    Empty,
    /// The input is too short.
    #[error("username must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The input is too long.
    #[error("username must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside the allowed set.
    #[error("username contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// An admin login name.
///
/// Usernames are compared case-insensitively: the database enforces a unique
/// index on `LOWER(username)` and lookups go through [`Username::normalized`].
///
/// ## Constraints
///
/// - Surrounding whitespace is trimmed
/// - Length: 3-64 characters
/// - ASCII letters, digits, and `.` `_` `-` `@`
///
/// ## Examples
///
/// ```
/// use crestline_core::Username;
///
/// assert!(Username::parse("admin").is_ok());
/// assert!(Username::parse("ops@crestline.dev").is_ok());
///
/// assert!(Username::parse("").is_err());
/// assert!(Username::parse("no spaces").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Minimum length of a username.
    pub const MIN_LENGTH: usize = 3;
    /// Maximum length of a username.
    pub const MAX_LENGTH: usize = 64;

    /// Parse a `Username` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, outside the length
    /// limits, or contains a disallowed character.
    pub fn parse(s: &str) -> Result<Self, UsernameError> {
        let s = s.trim();

        if s.is_empty() {
            return Err(UsernameError::Empty);
        }

        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@')))
        {
            return Err(UsernameError::InvalidCharacter(c));
        }

        if s.len() < Self::MIN_LENGTH {
            return Err(UsernameError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the username as entered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased form used for lookups and throttle keys.
    #[must_use]
    pub fn normalized(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    /// Consumes the `Username` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Username {
    type Err = UsernameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Username {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Username {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Username {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_usernames() {
        assert!(Username::parse("admin").is_ok());
        assert!(Username::parse("jane.doe").is_ok());
        assert!(Username::parse("ops_team-1").is_ok());
        assert!(Username::parse("ops@crestline.dev").is_ok());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let username = Username::parse("  admin \n").unwrap();
        assert_eq!(username.as_str(), "admin");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Username::parse("   "), Err(UsernameError::Empty));
    }

    #[test]
    fn test_parse_length_limits() {
        assert_eq!(
            Username::parse("ab"),
            Err(UsernameError::TooShort { min: 3 })
        );
        let long = "a".repeat(65);
        assert_eq!(
            Username::parse(&long),
            Err(UsernameError::TooLong { max: 64 })
        );
        assert!(Username::parse(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn test_parse_invalid_character() {
        assert_eq!(
            Username::parse("drop table"),
            Err(UsernameError::InvalidCharacter(' '))
        );
        assert_eq!(
            Username::parse("admin;"),
            Err(UsernameError::InvalidCharacter(';'))
        );
    }

    #[test]
    fn test_normalized_is_lowercase() {
        let username = Username::parse("Jane.Doe").unwrap();
        assert_eq!(username.normalized(), "jane.doe");
        assert_eq!(username.as_str(), "Jane.Doe");
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<Username>("\"admin\"").is_ok());
        assert!(serde_json::from_str::<Username>("\"a b\"").is_err());
    }
}
