//! Login lockout policy and per-login attempt tracking.
//!
//! The same arithmetic runs in two places: the admin client keeps one
//! [`LoginAttemptState`] for its login form, and the admin server keeps one
//! per username in its throttle. Time is always passed in explicitly so both
//! sides can be tested without a real clock.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Errors raised when building a [`LockoutPolicy`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LockoutPolicyError {
    /// `max_attempts` was zero.
    #[error("max attempts must be at least 1")]
    ZeroAttempts,
    /// The lockout window was zero or negative.
    #[error("lockout duration must be positive")]
    NonPositiveDuration,
}

/// How many consecutive failures are tolerated and how long the lock lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    max_attempts: u32,
    lockout_duration: TimeDelta,
}

impl LockoutPolicy {
    /// Default number of failures before locking.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    /// Default lockout window, in minutes.
    pub const DEFAULT_LOCKOUT_MINUTES: i64 = 15;

    /// Build a policy.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_attempts` is zero or the duration is not positive.
    pub fn new(max_attempts: u32, lockout_duration: TimeDelta) -> Result<Self, LockoutPolicyError> {
        if max_attempts == 0 {
            return Err(LockoutPolicyError::ZeroAttempts);
        }
        if lockout_duration <= TimeDelta::zero() {
            return Err(LockoutPolicyError::NonPositiveDuration);
        }
        Ok(Self {
            max_attempts,
            lockout_duration,
        })
    }

    /// Build a policy from a whole number of minutes.
    ///
    /// # Errors
    ///
    /// Same as [`LockoutPolicy::new`].
    pub fn from_minutes(max_attempts: u32, minutes: i64) -> Result<Self, LockoutPolicyError> {
        let duration =
            TimeDelta::try_minutes(minutes).ok_or(LockoutPolicyError::NonPositiveDuration)?;
        Self::new(max_attempts, duration)
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub const fn lockout_duration(&self) -> TimeDelta {
        self.lockout_duration
    }

    /// The lockout window as a `std` duration (for cache TTLs and timers).
    #[must_use]
    pub fn lockout_duration_std(&self) -> std::time::Duration {
        // Positive by construction.
        self.lockout_duration.to_std().unwrap_or_default()
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            lockout_duration: TimeDelta::minutes(Self::DEFAULT_LOCKOUT_MINUTES),
        }
    }
}

/// Result of recording a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Still allowed to try `remaining_attempts` more times.
    Remaining { remaining_attempts: u32 },
    /// The threshold was reached; locked until the given instant.
    Locked { until: DateTime<Utc> },
}

/// Consecutive-failure counter with an optional lockout expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginAttemptState {
    pub attempts: u32,
    pub last_attempt: Option<DateTime<Utc>>,
    pub locked_until: Option<DateTime<Utc>>,
}

impl LoginAttemptState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locked while `now` is strictly before the expiry.
    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }

    /// Time left on an active lock.
    #[must_use]
    pub fn remaining_lockout(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.locked_until
            .filter(|until| now < *until)
            .map(|until| until - now)
    }

    /// Whole seconds left on an active lock, rounded up.
    ///
    /// Never returns `Some(0)`: a lock with 300ms left reports one second.
    #[must_use]
    pub fn remaining_lockout_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        self.remaining_lockout(now).map(ceil_secs)
    }

    /// Failures still allowed before the lock engages.
    #[must_use]
    pub fn remaining_attempts(&self, policy: &LockoutPolicy) -> u32 {
        policy.max_attempts().saturating_sub(self.attempts)
    }

    /// Clear an expired lock so the attempt budget starts over.
    ///
    /// Returns `true` if a lock was released.
    pub fn release_expired(&mut self, now: DateTime<Utc>) -> bool {
        match self.locked_until {
            Some(until) if now >= until => {
                *self = Self::default();
                true
            }
            _ => false,
        }
    }

    /// Count a failed attempt at `now`.
    ///
    /// An active lock is left untouched and reported as-is; an expired one
    /// is released first.
    pub fn record_failure(&mut self, policy: &LockoutPolicy, now: DateTime<Utc>) -> AttemptOutcome {
        if let Some(until) = self.locked_until.filter(|until| now < *until) {
            return AttemptOutcome::Locked { until };
        }
        self.release_expired(now);

        self.attempts = self.attempts.saturating_add(1);
        self.last_attempt = Some(now);

        if self.attempts >= policy.max_attempts() {
            let until = now + policy.lockout_duration();
            self.locked_until = Some(until);
            AttemptOutcome::Locked { until }
        } else {
            AttemptOutcome::Remaining {
                remaining_attempts: self.remaining_attempts(policy),
            }
        }
    }

    /// Reset after a successful login.
    pub fn record_success(&mut self) {
        *self = Self::default();
    }

    /// Re-derive the state from values reported by the server.
    ///
    /// A reported `locked_until` wins; otherwise `remaining_attempts` sets the
    /// counter. Returns `false` (and changes nothing) when neither is present.
    pub fn adopt(
        &mut self,
        policy: &LockoutPolicy,
        remaining_attempts: Option<u32>,
        locked_until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        match (remaining_attempts, locked_until) {
            (_, Some(until)) => {
                self.attempts = policy.max_attempts();
                self.locked_until = Some(until);
            }
            (Some(remaining), None) => {
                self.attempts = policy.max_attempts().saturating_sub(remaining);
                self.locked_until = None;
            }
            (None, None) => return false,
        }
        self.last_attempt = Some(now);
        true
    }
}

fn ceil_secs(delta: TimeDelta) -> u64 {
    let whole = u64::try_from(delta.num_seconds()).unwrap_or(0);
    if delta.subsec_nanos() > 0 {
        whole + 1
    } else {
        whole
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + TimeDelta::seconds(secs)
    }

    #[test]
    fn test_default_policy() {
        let policy = LockoutPolicy::default();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.lockout_duration(), TimeDelta::minutes(15));
        assert_eq!(
            policy.lockout_duration_std(),
            std::time::Duration::from_secs(900)
        );
    }

    #[test]
    fn test_policy_rejects_invalid_values() {
        assert_eq!(
            LockoutPolicy::new(0, TimeDelta::minutes(1)),
            Err(LockoutPolicyError::ZeroAttempts)
        );
        assert_eq!(
            LockoutPolicy::from_minutes(3, 0),
            Err(LockoutPolicyError::NonPositiveDuration)
        );
        assert!(LockoutPolicy::from_minutes(3, 1).is_ok());
    }

    #[test]
    fn test_one_to_four_failures_are_not_locked() {
        let policy = LockoutPolicy::default();
        let mut state = LoginAttemptState::new();
        for n in 1..=4u32 {
            let outcome = state.record_failure(&policy, at(i64::from(n)));
            assert_eq!(
                outcome,
                AttemptOutcome::Remaining {
                    remaining_attempts: 5 - n
                }
            );
            assert!(!state.is_locked(at(i64::from(n))));
            assert_eq!(state.remaining_attempts(&policy), 5 - n);
        }
    }

    #[test]
    fn test_fifth_failure_locks_for_fifteen_minutes() {
        let policy = LockoutPolicy::default();
        let mut state = LoginAttemptState::new();
        for _ in 0..4 {
            state.record_failure(&policy, t0());
        }
        let outcome = state.record_failure(&policy, at(30));
        assert_eq!(outcome, AttemptOutcome::Locked { until: at(930) });
        assert_eq!(state.locked_until, Some(at(30) + TimeDelta::minutes(15)));
        assert_eq!(state.remaining_attempts(&policy), 0);
    }

    #[test]
    fn test_lock_timeline() {
        let policy = LockoutPolicy::default();
        let mut state = LoginAttemptState::new();
        for _ in 0..5 {
            state.record_failure(&policy, t0());
        }
        assert_eq!(state.locked_until, Some(at(900)));

        assert!(state.is_locked(at(500)));
        assert_eq!(state.remaining_lockout_secs(at(500)), Some(400));

        assert!(!state.is_locked(at(900)));
        assert!(!state.is_locked(at(901)));
        assert_eq!(state.remaining_lockout_secs(at(901)), None);
        assert!(state.release_expired(at(901)));
        assert_eq!(state, LoginAttemptState::default());
    }

    #[test]
    fn test_remaining_secs_round_up() {
        let state = LoginAttemptState {
            attempts: 5,
            last_attempt: None,
            locked_until: Some(t0() + TimeDelta::milliseconds(300)),
        };
        assert_eq!(state.remaining_lockout_secs(t0()), Some(1));
        assert_eq!(
            state.remaining_lockout_secs(t0() + TimeDelta::milliseconds(300)),
            None
        );
    }

    #[test]
    fn test_failure_while_locked_does_not_extend() {
        let policy = LockoutPolicy::default();
        let mut state = LoginAttemptState::new();
        for _ in 0..5 {
            state.record_failure(&policy, t0());
        }
        let outcome = state.record_failure(&policy, at(100));
        assert_eq!(outcome, AttemptOutcome::Locked { until: at(900) });
        assert_eq!(state.attempts, 5);
    }

    #[test]
    fn test_failure_after_expiry_starts_fresh_budget() {
        let policy = LockoutPolicy::default();
        let mut state = LoginAttemptState::new();
        for _ in 0..5 {
            state.record_failure(&policy, t0());
        }
        let outcome = state.record_failure(&policy, at(1000));
        assert_eq!(
            outcome,
            AttemptOutcome::Remaining {
                remaining_attempts: 4
            }
        );
        assert_eq!(state.locked_until, None);
    }

    #[test]
    fn test_success_resets_at_any_count() {
        let policy = LockoutPolicy::default();
        for failures in 0..5 {
            let mut state = LoginAttemptState::new();
            for _ in 0..failures {
                state.record_failure(&policy, t0());
            }
            state.record_success();
            assert_eq!(state.attempts, 0);
            assert_eq!(state.locked_until, None);
        }
    }

    #[test]
    fn test_adopt_server_values() {
        let policy = LockoutPolicy::default();
        let mut state = LoginAttemptState::new();

        assert!(state.adopt(&policy, Some(2), None, t0()));
        assert_eq!(state.attempts, 3);
        assert!(!state.is_locked(t0()));

        assert!(state.adopt(&policy, Some(0), Some(at(600)), t0()));
        assert_eq!(state.attempts, 5);
        assert!(state.is_locked(at(599)));

        let before = state.clone();
        assert!(!state.adopt(&policy, None, None, at(1)));
        assert_eq!(state, before);
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let state = LoginAttemptState {
            attempts: 1,
            last_attempt: Some(t0()),
            locked_until: None,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["attempts"], 1);
        assert!(json.get("lastAttempt").is_some());
        assert!(json.get("lockedUntil").is_some());
    }
}
