//! Bounded retry for rate-limited remote calls
//!
//! [`RetryPolicy::decide`] is a pure function from (attempt, error class) to a
//! decision. [`RetryExecutor`] applies it around a remote call, sleeping
//! through the injected [`Sleeper`] and reporting each scheduled retry.

use crate::error::RetryError;
use crate::report::{Reporter, TransferEvent};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::time::Sleeper;
use core_runtime::config::AppConfig;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Total attempts for a rate-limited call
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Delay before the first retry
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1_000);

/// Upper bound for any single delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(32_000);

/// Whether an error is worth repeating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    RateLimited,
    Permanent,
}

impl ErrorClass {
    pub fn of(error: &BridgeError) -> Self {
        if error.is_rate_limited() {
            ErrorClass::RateLimited
        } else {
            ErrorClass::Permanent
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Exponential backoff bounded by a total attempt count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first call; values below 1 are raised to 1.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.max_retry,
            config.retry_base_delay,
            config.retry_max_delay,
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the given failed attempt (1-based): base * 2^(attempt-1), capped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Decide what to do after attempt number `attempt` (1-based) failed
    pub fn decide(&self, attempt: u32, class: ErrorClass) -> RetryDecision {
        match class {
            ErrorClass::RateLimited if attempt < self.max_attempts => {
                RetryDecision::RetryAfter(self.delay_for(attempt))
            }
            _ => RetryDecision::GiveUp,
        }
    }
}

/// Runs remote calls under a [`RetryPolicy`]
pub struct RetryExecutor<'a> {
    policy: RetryPolicy,
    sleeper: &'a dyn Sleeper,
    reporter: &'a dyn Reporter,
}

impl<'a> RetryExecutor<'a> {
    pub fn new(policy: RetryPolicy, sleeper: &'a dyn Sleeper, reporter: &'a dyn Reporter) -> Self {
        Self {
            policy,
            sleeper,
            reporter,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call `call` until it succeeds, fails permanently, or runs out of attempts
    ///
    /// `operation` names the call in retry events and errors.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BridgeResult<T>>,
    {
        let mut attempt = 1;
        loop {
            let error = match call().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let class = ErrorClass::of(&error);
            match self.policy.decide(attempt, class) {
                RetryDecision::RetryAfter(delay) => {
                    self.reporter.report(&TransferEvent::RetryScheduled {
                        operation: operation.to_string(),
                        attempt,
                        max_attempts: self.policy.max_attempts,
                        delay,
                        error: error.to_string(),
                    });
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::GiveUp if class == ErrorClass::RateLimited => {
                    debug!(operation, attempts = attempt, "Retry budget exhausted");
                    return Err(RetryError::Exhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        last: error,
                    });
                }
                RetryDecision::GiveUp => {
                    return Err(RetryError::Failed {
                        operation: operation.to_string(),
                        source: error,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    fn rate_limited() -> BridgeError {
        BridgeError::RateLimited {
            status: 429,
            message: "slow down".to_string(),
        }
    }

    #[test]
    fn test_delays_double_and_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(4), Duration::from_secs(8));
        assert_eq!(policy.delay_for(6), Duration::from_secs(32));
        assert_eq!(policy.delay_for(40), Duration::from_secs(32));
    }

    #[test]
    fn test_decide() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100), Duration::from_secs(1));

        assert_eq!(
            policy.decide(1, ErrorClass::RateLimited),
            RetryDecision::RetryAfter(Duration::from_millis(100))
        );
        assert_eq!(
            policy.decide(2, ErrorClass::RateLimited),
            RetryDecision::RetryAfter(Duration::from_millis(200))
        );
        assert_eq!(policy.decide(3, ErrorClass::RateLimited), RetryDecision::GiveUp);
        assert_eq!(policy.decide(1, ErrorClass::Permanent), RetryDecision::GiveUp);
    }

    #[test]
    fn test_single_attempt_policy_never_retries() {
        let policy = RetryPolicy::new(0, Duration::from_millis(100), Duration::from_millis(10));
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.decide(1, ErrorClass::RateLimited), RetryDecision::GiveUp);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
    }

    #[test]
    fn test_error_class() {
        assert_eq!(ErrorClass::of(&rate_limited()), ErrorClass::RateLimited);
        assert_eq!(
            ErrorClass::of(&BridgeError::Http {
                status: 403,
                message: "forbidden".to_string()
            }),
            ErrorClass::Permanent
        );
        assert_eq!(
            ErrorClass::of(&BridgeError::Network("reset".to_string())),
            ErrorClass::Permanent
        );
    }

    #[tokio::test]
    async fn test_run_retries_then_succeeds() {
        let sleeper = RecordingSleeper::default();
        let reporter = MemoryReporter::new();
        let executor = RetryExecutor::new(RetryPolicy::default(), &sleeper, &reporter);
        let calls = AtomicU32::new(0);

        let value = executor
            .run("list", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(rate_limited())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
        assert_eq!(reporter.retries().len(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_at_bound() {
        let sleeper = RecordingSleeper::default();
        let reporter = MemoryReporter::new();
        let policy = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(40));
        let executor = RetryExecutor::new(policy, &sleeper, &reporter);
        let calls = AtomicU32::new(0);

        let err = executor
            .run("delete", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(rate_limited()) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(err.is_exhausted());
        assert!(matches!(err, RetryError::Exhausted { attempts: 3, .. }));
        assert_eq!(sleeper.delays.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let sleeper = RecordingSleeper::default();
        let reporter = MemoryReporter::new();
        let executor = RetryExecutor::new(RetryPolicy::default(), &sleeper, &reporter);
        let calls = AtomicU32::new(0);

        let err = executor
            .run("download", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(BridgeError::NotFound("f1".to_string())) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!err.is_exhausted());
        assert!(matches!(err.last_error(), BridgeError::NotFound(_)));
        assert!(sleeper.delays.lock().unwrap().is_empty());
        assert!(reporter.events().is_empty());
    }
}
