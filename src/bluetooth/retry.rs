/// Bounded exponential-backoff retry for transport operations
use log::{error, info, warn};
use std::future::Future;
use tokio::time::{sleep, Duration};

use crate::error::{PollerError, TransportError};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy; an attempt count of 0 is raised to 1
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        if max_attempts == 0 {
            warn!("Retry count of 0 is not usable, using a single attempt");
        }
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after the failed attempt with the given 0-based index: `base_delay * 2^attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt.min(31)))
    }
}

/// Run `attempt` until it succeeds, fails with a non-transient error, or
/// the policy runs out of attempts.
///
/// # Arguments
/// * `policy` - Attempt bound and backoff base
/// * `operation` - Label used in logs and in the resulting error
/// * `attempt` - Produces one fresh transport future per call
///
/// # Returns
/// The operation's value, or `PollerError::LinkFailure` carrying the last
/// transport error
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut attempt: F,
) -> Result<T, PollerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let max_attempts = policy.max_attempts();
    let mut index = 0;

    loop {
        let err = match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        let attempts = index + 1;

        if !err.is_transient() {
            error!("{} failed and will not be retried: {}", operation, err);
            return Err(PollerError::LinkFailure {
                operation,
                attempts,
                source: err,
            });
        }

        info!(
            "{} failed (try {} of {}): {}",
            operation, attempts, max_attempts, err
        );

        if attempts >= max_attempts {
            error!("{}: retry finally failed!", operation);
            return Err(PollerError::LinkFailure {
                operation,
                attempts,
                source: err,
            });
        }

        sleep(policy.delay_for(index)).await;
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::time::Instant;

    fn link_error() -> TransportError {
        TransportError::Link("connection timed out".to_string())
    }

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = RetryPolicy::new(5, Duration::from_millis(500));
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_zero_attempts_raised_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_all_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        let calls = Cell::new(0u32);

        let result: Result<(), _> = retry(&policy, "read 0x35", || {
            calls.set(calls.get() + 1);
            async { Err(link_error()) }
        })
        .await;

        assert_eq!(calls.get(), 3);
        assert_eq!(
            result,
            Err(PollerError::LinkFailure {
                operation: "read 0x35",
                attempts: 3,
                source: link_error(),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_last_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        let calls = Cell::new(0u32);
        let start = Instant::now();

        let result = retry(&policy, "read 0x38", || {
            calls.set(calls.get() + 1);
            let call = calls.get();
            async move {
                if call < 3 {
                    Err(link_error())
                } else {
                    Ok(vec![0x5a, 0x00])
                }
            }
        })
        .await;

        assert_eq!(result, Ok(vec![0x5a, 0x00]));
        assert_eq!(calls.get(), 3);
        // 500 ms after the first failure, 1 s after the second
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_errors_are_not_retried() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        let calls = Cell::new(0u32);

        let result: Result<(), _> = retry(&policy, "connect", || {
            calls.set(calls.get() + 1);
            async { Err(TransportError::Rejected("invalid address".to_string())) }
        })
        .await;

        assert_eq!(calls.get(), 1);
        assert!(matches!(
            result,
            Err(PollerError::LinkFailure { attempts: 1, .. })
        ));
    }
}
