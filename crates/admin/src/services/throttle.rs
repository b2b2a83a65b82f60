//! Per-username login throttle.
//!
//! Failed attempts are counted per normalized username in a `moka` cache.
//! Each entry sits behind an async mutex: a login holds the username's
//! [`AttemptPermit`] from the lock check through password verification to
//! the recorded outcome, so concurrent guesses for one username are checked
//! one at a time and never exceed the policy. Entries that stay idle for a
//! full lockout window are evicted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use crestline_core::{AttemptOutcome, LockoutPolicy, LoginAttemptState};
use moka::future::Cache;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

/// Upper bound on tracked usernames.
const MAX_TRACKED_USERNAMES: u64 = 100_000;

/// Result of checking a username before verifying its password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleStatus {
    /// Attempts are allowed.
    Open { remaining_attempts: u32 },
    /// Locked; no password check may be performed.
    Locked { until: DateTime<Utc> },
}

/// Shared, cloneable login throttle.
#[derive(Clone)]
pub struct LoginThrottle {
    inner: Arc<LoginThrottleInner>,
}

struct LoginThrottleInner {
    policy: LockoutPolicy,
    attempts: Cache<String, Arc<Mutex<LoginAttemptState>>>,
}

impl std::fmt::Debug for LoginThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginThrottle")
            .field("policy", &self.inner.policy)
            .field("tracked", &self.inner.attempts.entry_count())
            .finish()
    }
}

impl LoginThrottle {
    /// Create a throttle enforcing `policy`.
    #[must_use]
    pub fn new(policy: LockoutPolicy) -> Self {
        let attempts = Cache::builder()
            .max_capacity(MAX_TRACKED_USERNAMES)
            .time_to_idle(policy.lockout_duration_std())
            .build();

        Self {
            inner: Arc::new(LoginThrottleInner { policy, attempts }),
        }
    }

    /// The enforced policy.
    #[must_use]
    pub fn policy(&self) -> &LockoutPolicy {
        &self.inner.policy
    }

    /// Take exclusive hold of `key`'s attempt counter.
    ///
    /// Waits while another login for the same username holds it.
    pub async fn acquire(&self, key: &str) -> AttemptPermit {
        let slot = self
            .inner
            .attempts
            .get_with(key.to_owned(), async {
                Arc::new(Mutex::new(LoginAttemptState::new()))
            })
            .await;

        AttemptPermit {
            key: key.to_owned(),
            policy: self.inner.policy,
            state: slot.lock_owned().await,
        }
    }

    /// Whether `key` may attempt a login at `now`.
    pub async fn check(&self, key: &str, now: DateTime<Utc>) -> ThrottleStatus {
        self.acquire(key).await.status(now)
    }
}

/// Exclusive hold on one username's attempt counter.
///
/// Dropping the permit lets the next login for that username proceed.
pub struct AttemptPermit {
    key: String,
    policy: LockoutPolicy,
    state: OwnedMutexGuard<LoginAttemptState>,
}

impl std::fmt::Debug for AttemptPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttemptPermit")
            .field("key", &self.key)
            .field("state", &*self.state)
            .finish()
    }
}

impl AttemptPermit {
    /// Lock status at `now`. An expired lock is released and the budget
    /// starts over.
    pub fn status(&mut self, now: DateTime<Utc>) -> ThrottleStatus {
        if let Some(until) = self.state.locked_until.filter(|until| now < *until) {
            return ThrottleStatus::Locked { until };
        }
        self.state.release_expired(now);
        ThrottleStatus::Open {
            remaining_attempts: self.state.remaining_attempts(&self.policy),
        }
    }

    /// Count a failed attempt at `now`.
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> AttemptOutcome {
        let outcome = self.state.record_failure(&self.policy, now);
        match outcome {
            AttemptOutcome::Locked { until } => {
                info!(username = %self.key, %until, "Login locked after repeated failures");
            }
            AttemptOutcome::Remaining { remaining_attempts } => {
                debug!(username = %self.key, remaining_attempts, "Login failure recorded");
            }
        }
        outcome
    }

    /// Reset the counter after a successful login.
    pub fn record_success(&mut self) {
        self.state.record_success();
    }
}
