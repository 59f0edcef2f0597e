use std::time::Duration;

/// Bounded exponential backoff used while a vector flag is still locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRetryPolicy {
    /// Delay before the second check.
    pub base_delay: Duration,
    /// Growth factor applied per attempt.
    pub multiplier: u32,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
    /// Total time to wait before giving up.
    pub deadline: Duration,
}

impl Default for LockRetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(50),
            multiplier: 2,
            max_delay: Duration::from_secs(2),
            deadline: Duration::from_secs(30),
        }
    }
}

impl LockRetryPolicy {
    /// Policy whose delays are all `delay`, giving up after `deadline`.
    #[must_use]
    pub const fn fixed(delay: Duration, deadline: Duration) -> Self {
        Self {
            base_delay: delay,
            multiplier: 1,
            max_delay: delay,
            deadline,
        }
    }

    /// Delay to sleep after the `attempt`-th failed check (zero-based).
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use paises_data::flags::LockRetryPolicy;
    ///
    /// let policy = LockRetryPolicy::default();
    /// assert_eq!(policy.delay_for(0), Duration::from_millis(50));
    /// assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    /// assert_eq!(policy.delay_for(30), Duration::from_secs(2));
    /// ```
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 50)]
    #[case(1, 100)]
    #[case(2, 200)]
    #[case(5, 1_600)]
    #[case(6, 2_000)]
    #[case(u32::MAX, 2_000)]
    fn delays_grow_until_capped(#[case] attempt: u32, #[case] millis: u64) {
        assert_eq!(
            LockRetryPolicy::default().delay_for(attempt),
            Duration::from_millis(millis)
        );
    }

    #[rstest]
    fn fixed_policy_never_grows() {
        let policy = LockRetryPolicy::fixed(Duration::from_millis(5), Duration::from_secs(1));
        assert_eq!(policy.delay_for(10), Duration::from_millis(5));
    }
}
