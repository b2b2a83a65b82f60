//! Lockout countdown for the login form.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Publishes the remaining lockout seconds while a lock is active.
///
/// The value changes once per second, is rounded up, and becomes `None`
/// when the lock expires. Dropping the countdown stops the background task.
#[derive(Debug)]
pub struct LockoutCountdown {
    rx: watch::Receiver<Option<u64>>,
    task: JoinHandle<()>,
}

impl LockoutCountdown {
    /// Start counting down `remaining`. Must be called inside a tokio runtime.
    #[must_use]
    pub fn start(remaining: Duration) -> Self {
        let deadline = Instant::now() + remaining;
        let (tx, rx) = watch::channel(display_secs(remaining));

        let task = tokio::spawn(async move {
            loop {
                let left = deadline.saturating_duration_since(Instant::now());
                let Some(secs) = display_secs(left) else {
                    tx.send_replace(None);
                    debug!("Lockout countdown finished");
                    return;
                };
                tx.send_replace(Some(secs));

                // Sleep until the displayed value next changes.
                let next_change = left.saturating_sub(Duration::from_secs(secs - 1));
                tokio::select! {
                    () = tokio::time::sleep(next_change) => {}
                    () = tx.closed() => return,
                }
            }
        });

        Self { rx, task }
    }

    /// A receiver for rendering; `None` means the lock has expired.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<u64>> {
        self.rx.clone()
    }

    /// The most recently published value.
    #[must_use]
    pub fn remaining_secs(&self) -> Option<u64> {
        *self.rx.borrow()
    }

    /// Whether the lock is still being counted down.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.remaining_secs().is_some()
    }
}

impl Drop for LockoutCountdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Whole seconds, rounded up; `None` once nothing is left.
fn display_secs(left: Duration) -> Option<u64> {
    if left.is_zero() {
        return None;
    }
    let whole = left.as_secs();
    Some(if left.subsec_nanos() > 0 { whole + 1 } else { whole })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_secs_rounds_up() {
        assert_eq!(display_secs(Duration::ZERO), None);
        assert_eq!(display_secs(Duration::from_millis(1)), Some(1));
        assert_eq!(display_secs(Duration::from_secs(3)), Some(3));
        assert_eq!(display_secs(Duration::from_millis(2500)), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_down_each_second_then_clears() {
        let start = Instant::now();
        let countdown = LockoutCountdown::start(Duration::from_secs(3));
        let mut rx = countdown.subscribe();

        let mut seen = vec![*rx.borrow_and_update()];
        while rx.changed().await.is_ok() {
            let value = *rx.borrow_and_update();
            if seen.last() != Some(&value) {
                seen.push(value);
            }
            if value.is_none() {
                break;
            }
        }

        assert_eq!(seen, vec![Some(3), Some(2), Some(1), None]);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert!(!countdown.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fractional_start_aligns_to_expiry() {
        let start = Instant::now();
        let countdown = LockoutCountdown::start(Duration::from_millis(1500));
        assert_eq!(countdown.remaining_secs(), Some(2));

        let mut rx = countdown.subscribe();
        rx.wait_for(Option::is_none).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_at_midpoint() {
        let countdown = LockoutCountdown::start(Duration::from_secs(900));
        tokio::time::sleep(Duration::from_millis(500_500)).await;
        tokio::task::yield_now().await;
        assert_eq!(countdown.remaining_secs(), Some(400));
    }
}
