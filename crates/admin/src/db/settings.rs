//! Settings database operations.
//!
//! Global key/value settings stored as JSONB in `admin.system_setting`.

use crestline_core::LockoutPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;

/// Key of the lockout policy override.
pub const LOCKOUT_POLICY_KEY: &str = "auth.lockout";

/// Error type for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid setting {0}: {1}")]
    Invalid(&'static str, String),
}

/// Stored form of the lockout override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockoutSetting {
    pub max_attempts: u32,
    pub lockout_minutes: i64,
}

impl TryFrom<LockoutSetting> for LockoutPolicy {
    type Error = SettingsError;

    fn try_from(setting: LockoutSetting) -> Result<Self, Self::Error> {
        Self::from_minutes(setting.max_attempts, setting.lockout_minutes)
            .map_err(|e| SettingsError::Invalid(LOCKOUT_POLICY_KEY, e.to_string()))
    }
}

/// Get a global setting value.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn get_setting(pool: &PgPool, key: &str) -> Result<Option<JsonValue>, SettingsError> {
    let result = sqlx::query_scalar::<_, JsonValue>(
        "SELECT value FROM admin.system_setting WHERE key = $1",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(result)
}

/// Set a global setting value.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn set_setting(pool: &PgPool, key: &str, value: &JsonValue) -> Result<(), SettingsError> {
    sqlx::query(
        "INSERT INTO admin.system_setting (key, value) VALUES ($1, $2) \
         ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// The stored lockout override, if any.
///
/// # Errors
///
/// Returns an error if the query fails or the stored value is malformed.
pub async fn get_lockout_policy(pool: &PgPool) -> Result<Option<LockoutPolicy>, SettingsError> {
    let Some(value) = get_setting(pool, LOCKOUT_POLICY_KEY).await? else {
        return Ok(None);
    };
    let setting: LockoutSetting = serde_json::from_value(value)?;
    Ok(Some(setting.try_into()?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lockout_setting_parses_camel_case() {
        let setting: LockoutSetting =
            serde_json::from_value(serde_json::json!({"maxAttempts": 3, "lockoutMinutes": 30}))
                .unwrap();
        let policy = LockoutPolicy::try_from(setting).unwrap();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.lockout_duration(), chrono::TimeDelta::minutes(30));
    }

    #[test]
    fn test_lockout_setting_rejects_zero_attempts() {
        let setting = LockoutSetting {
            max_attempts: 0,
            lockout_minutes: 15,
        };
        assert!(matches!(
            LockoutPolicy::try_from(setting),
            Err(SettingsError::Invalid(LOCKOUT_POLICY_KEY, _))
        ));
    }
}
