//! Retry budgets for convergence checks.
//!
//! A [`PollPolicy`] pairs a fixed sleep interval with a maximum number of
//! check invocations. Worst-case wall time is
//! `interval * (max_attempts - 1)` plus the time spent in the checks.

use std::time::Duration;

use crate::error::CheckerError;

/// Interval and attempt budget for one poll loop.
///
/// Immutable once built. Both invariants (`max_attempts >= 1`,
/// `interval > 0`) are enforced by [`PollPolicy::new`] and hold for the
/// built-in presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    interval: Duration,
    max_attempts: u32,
}

impl PollPolicy {
    /// Creates a validated policy.
    ///
    /// # Errors
    ///
    /// Returns [`CheckerError::InvalidPolicy`] if `max_attempts` is zero or
    /// `interval` is zero.
    pub fn new(interval: Duration, max_attempts: u32) -> Result<Self, CheckerError> {
        if max_attempts == 0 {
            return Err(CheckerError::InvalidPolicy(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if interval.is_zero() {
            return Err(CheckerError::InvalidPolicy(
                "interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            interval,
            max_attempts,
        })
    }

    /// 1 s between checks, 30 checks.
    #[must_use]
    pub const fn version_check() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 30,
        }
    }

    /// 10 s between checks, 180 checks. The inspection depends on a
    /// background task in the cluster, hence the long budget.
    #[must_use]
    pub const fn inspection_check() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: 180,
        }
    }

    /// 5 s between checks, 10 checks.
    #[must_use]
    pub const fn parameter_sync() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 10,
        }
    }

    /// Sleep between two consecutive checks.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Maximum number of check invocations.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Upper bound on the total sleep time of one poll loop.
    #[must_use]
    pub fn worst_case_wait(&self) -> Duration {
        self.interval
            .saturating_mul(self.max_attempts.saturating_sub(1))
    }
}

/// Successful outcome of a poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Converged {
    /// Number of check invocations, including the successful one.
    pub attempts: u32,
    /// Total time slept between checks.
    pub waited: Duration,
}

impl Converged {
    /// Number of sleeps performed before the check succeeded.
    #[must_use]
    pub const fn sleeps(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_documented_budgets() {
        let v = PollPolicy::version_check();
        assert_eq!(v.interval(), Duration::from_secs(1));
        assert_eq!(v.max_attempts(), 30);

        let i = PollPolicy::inspection_check();
        assert_eq!(i.interval(), Duration::from_secs(10));
        assert_eq!(i.max_attempts(), 180);

        let s = PollPolicy::parameter_sync();
        assert_eq!(s.interval(), Duration::from_secs(5));
        assert_eq!(s.max_attempts(), 10);
    }

    #[test]
    fn rejects_zero_attempts() {
        let result = PollPolicy::new(Duration::from_secs(1), 0);
        assert!(matches!(result, Err(CheckerError::InvalidPolicy(_))));
    }

    #[test]
    fn rejects_zero_interval() {
        let result = PollPolicy::new(Duration::ZERO, 3);
        assert!(matches!(result, Err(CheckerError::InvalidPolicy(_))));
    }

    #[test]
    fn single_attempt_never_waits() {
        let Ok(policy) = PollPolicy::new(Duration::from_secs(7), 1) else {
            unreachable!("valid policy");
        };
        assert_eq!(policy.worst_case_wait(), Duration::ZERO);
    }

    #[test]
    fn worst_case_wait_of_sync_policy() {
        assert_eq!(
            PollPolicy::parameter_sync().worst_case_wait(),
            Duration::from_secs(45)
        );
    }

    #[test]
    fn converged_counts_sleeps() {
        let c = Converged {
            attempts: 3,
            waited: Duration::from_secs(2),
        };
        assert_eq!(c.sleeps(), 2);
    }
}
