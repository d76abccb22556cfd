//! Bounded retry with exponential backoff for device calls.

use std::future::Future;
use std::time::Duration;

use nightheat_traits::Clock;

use crate::error::Result;

/// Attempts and delays for one device call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; 0 is treated as 1.
    pub max_attempts: u32,
    /// Delay after the first failure; doubles after each further failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the `failures`-th failure (1-based).
    pub fn backoff(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exp)
    }

    #[inline]
    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Run `f` until it succeeds, fails permanently, or attempts run out.
///
/// Only transient errors (`ThermoError::is_transient`) are retried. Backoff
/// goes through `clock.sleep` so tests never block.
pub async fn with_retry<T, C, F, Fut>(
    policy: &RetryPolicy,
    clock: &C,
    op: &'static str,
    mut f: F,
) -> Result<T>
where
    C: Clock + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < policy.attempts() => {
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    op,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "device call failed; retrying"
                );
                clock.sleep(delay).await;
            }
            Err(e) => {
                tracing::debug!(op, attempt, error = %e, "device call failed; giving up");
                return Err(e);
            }
        }
    }
}
