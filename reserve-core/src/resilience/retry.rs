//! Bounded retries with exponential backoff around breaker-gated calls.

use std::fmt::Display;
use std::thread;
use std::time::Duration;

use super::breaker::CircuitBreaker;
use crate::error::CallError;

/// Retries attempted after the first call.
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// Delay before the first retry; doubled for each further retry.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(200);

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Retry up to `max_retries` times starting from `backoff`.
    #[must_use]
    pub const fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Retries attempted after the first call.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Base backoff delay.
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Delay before retry number `attempt`, counting the first retry as one.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use reserve_core::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(3, Duration::from_millis(100));
    /// assert_eq!(policy.delay_for(1), Duration::from_millis(100));
    /// assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    /// ```
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.backoff.saturating_mul(factor)
    }
}

/// Runs an operation through a breaker, retrying failures.
///
/// An open circuit is returned at once; retrying a dependency that is known
/// to be down only delays the caller's fallback. The backoff sleep happens
/// with no lock held.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create an executor for `policy`.
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Policy in force.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Call `op` through `breaker` until it succeeds, the circuit opens, or
    /// retries run out.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::CircuitOpen`] when the breaker rejects the first
    /// attempt. Otherwise returns the last [`CallError::Failed`] once retries
    /// run out or a failure opens the circuit; no backoff follows the failure
    /// that opened it.
    pub fn run<T, E, F>(&self, breaker: &CircuitBreaker, mut op: F) -> Result<T, CallError<E>>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
    {
        let mut attempt = 0_u32;
        loop {
            match breaker.call(&mut op) {
                Ok(value) => return Ok(value),
                Err(err @ CallError::CircuitOpen { .. }) => return Err(err),
                Err(CallError::Failed(err)) => {
                    if attempt >= self.policy.max_retries || breaker.is_open() {
                        return Err(CallError::Failed(err));
                    }
                    attempt += 1;
                    let delay = self.policy.delay_for(attempt);
                    log::warn!(
                        "{} call failed ({err}); retry {attempt}/{} in {delay:?}",
                        breaker.name(),
                        self.policy.max_retries
                    );
                    thread::sleep(delay);
                }
            }
        }
    }
}
