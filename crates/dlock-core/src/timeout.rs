//! Retry timing helpers.

use std::time::{Duration, Instant};

/// Fixed delay between unsuccessful acquisition attempts in a retry loop.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Bounded wait used by `try_lock` when the caller passes no timeout.
pub const DEFAULT_TRY_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Acquisition deadline, computed once at entry to a retry loop.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    /// Time left before the deadline, `None` once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        let now = Instant::now();
        if now >= self.at {
            None
        } else {
            Some(self.at - now)
        }
    }

    /// Whether the deadline has passed.
    pub fn has_passed(&self) -> bool {
        self.remaining().is_none()
    }

    /// Next retry sleep: the poll interval, clipped to the remaining budget.
    /// `None` once the deadline has passed.
    pub fn poll_sleep(&self) -> Option<Duration> {
        self.remaining().map(|rest| rest.min(POLL_INTERVAL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_deadline_has_remaining_budget() {
        let deadline = Deadline::after(Duration::from_secs(10));
        assert!(!deadline.has_passed());
        assert!(deadline.remaining().unwrap() > Duration::from_secs(9));
    }

    #[test]
    fn zero_timeout_passes_immediately() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(deadline.has_passed());
        assert!(deadline.poll_sleep().is_none());
    }

    #[test]
    fn poll_sleep_is_clipped_to_the_remaining_budget() {
        let deadline = Deadline::after(Duration::from_millis(30));
        let sleep = deadline.poll_sleep().unwrap();
        assert!(sleep <= Duration::from_millis(30));

        let deadline = Deadline::after(Duration::from_secs(10));
        assert_eq!(deadline.poll_sleep().unwrap(), POLL_INTERVAL);
    }
}
