/// Retry with exponential backoff, and the pauses it is built on

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::core::error::Retryable;

/// Something that can wait. Every delay in the checker goes through this.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn pause(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`: base × multiplier^attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        let secs = self.base_delay.as_secs_f64() * factor;
        if secs.is_nan() || secs < 0.0 {
            return self.base_delay;
        }
        // saturate instead of overflowing on huge multipliers
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Run `operation`, retrying retryable errors with backoff.
///
/// Non-retryable errors are returned immediately. After the last attempt
/// the last error is returned.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: Retryable + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    call = label,
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts(),
                    retry_in = ?delay,
                    error = %err,
                    "network error, retrying"
                );
                sleeper.pause(delay).await;
                attempt += 1;
            }
            Err(err) => {
                if err.is_retryable() {
                    warn!(call = label, attempts = attempt + 1, error = %err, "retries exhausted");
                }
                return Err(err);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::testing::RecordingSleeper;
    use super::*;
    use crate::core::error::{ClaimError, TransportError};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }

    fn timeout() -> ClaimError {
        ClaimError::from(TransportError::Timeout {
            url: "https://example.invalid".to_string(),
        })
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let policy = policy();
        assert_eq!(policy.delay_for(0), Duration::from_secs(5));
        assert_eq!(policy.delay_for(1), Duration::from_secs(10));
        assert_eq!(policy.delay_for(2), Duration::from_secs(20));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_backoff_saturates_on_overflow() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_secs(5),
            multiplier: 1000.0,
        };
        assert_eq!(policy.delay_for(6), Duration::from_secs(5_000_000_000_000_000_000));
        assert_eq!(policy.delay_for(7), Duration::MAX);
        assert_eq!(policy.delay_for(200), Duration::MAX);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<u32, ClaimError> = with_retry(&policy(), &sleeper, "test", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(timeout())
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.pauses(),
            vec![Duration::from_secs(5), Duration::from_secs(10)]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<(), ClaimError> = with_retry(&policy(), &sleeper, "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(timeout())
        })
        .await;

        assert!(matches!(result, Err(ClaimError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(sleeper.pauses().len(), 3);
    }

    #[tokio::test]
    async fn test_protocol_errors_are_not_retried() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result: Result<(), ClaimError> = with_retry(&policy(), &sleeper, "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ClaimError::protocol("missing field 1"))
        })
        .await;

        assert!(matches!(result, Err(ClaimError::Protocol(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.pauses().is_empty());
    }
}
