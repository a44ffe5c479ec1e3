//! Minimum spacing between dispatches on one client.
//!
//! Best-effort and non-atomic: the wait is computed from the last recorded
//! timestamp, and the timestamp is only written once a request succeeds, so
//! overlapping calls can all observe the same stale timestamp and proceed
//! together.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// How long to wait at `now` so that at least `delay` separates it from `last`.
#[must_use]
pub fn remaining_wait(now: i64, last: i64, delay: Duration) -> Option<Duration> {
    let delay_ms = i128::try_from(delay.as_millis()).unwrap_or(i128::MAX);
    let elapsed = i128::from(now) - i128::from(last);
    if elapsed >= delay_ms {
        return None;
    }
    let wait = u64::try_from(delay_ms - elapsed).unwrap_or(u64::MAX);
    Some(Duration::from_millis(wait))
}

/// Per-client rate limiter state.
#[derive(Debug)]
pub struct RateLimiter {
    delay_ms: AtomicU64,
    last_request: AtomicI64,
}

impl RateLimiter {
    /// Create a limiter with no recorded request.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay_ms: AtomicU64::new(duration_millis(delay)),
            last_request: AtomicI64::new(0),
        }
    }

    /// Minimum spacing between dispatches.
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.load(Ordering::Relaxed))
    }

    /// Change the spacing.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(duration_millis(delay), Ordering::Relaxed);
    }

    /// Epoch milliseconds of the last successful dispatch, `0` if none.
    #[must_use]
    pub fn last_request(&self) -> i64 {
        self.last_request.load(Ordering::Relaxed)
    }

    /// Record a dispatch at `timestamp` epoch milliseconds.
    pub fn set_last_request(&self, timestamp: i64) {
        self.last_request.store(timestamp, Ordering::Relaxed);
    }

    /// Wait still owed as of `now`.
    #[must_use]
    pub fn wait_at(&self, now: i64) -> Option<Duration> {
        remaining_wait(now, self.last_request(), self.delay())
    }

    /// Sleep until the spacing since the last dispatch has elapsed.
    pub async fn throttle(&self) {
        if let Some(wait) = self.wait_at(now_millis()) {
            tracing::debug!(wait_ms = wait.as_millis() as u64, "Rate limit: delaying request");
            tokio::time::sleep(wait).await;
        }
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
