//! Bounded retry policy with exponential backoff and escalation.
//!
//! ```text
//! ATTEMPTING ──ok──────────────────────────────▶ SUCCESS
//!     │ rate-limited / transient
//!     ├─ failures ≤ max_retries ─▶ BACKOFF (base · 2^(n-1)) ─▶ ATTEMPTING
//!     ├─ escalations left ──────▶ ESCALATED_WAIT (fixed) ───▶ ATTEMPTING
//!     └─ otherwise ─────────────▶ EXHAUSTED
//!     │ hard error
//!     └─────────────────────────▶ EXHAUSTED
//! ```

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{FetchError, RetryError};
use crate::sleep::Sleeper;

/// Default number of backoff retries.
pub const DEFAULT_MAX_RETRIES: u32 = 5;
/// Default base delay for exponential backoff.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(5);
/// Default wait once backoff is used up.
pub const DEFAULT_ESCALATION_DELAY: Duration = Duration::from_secs(600);
/// Default number of escalated waits before giving up.
pub const DEFAULT_MAX_ESCALATIONS: u32 = 3;

// ============================================================================
// State
// ============================================================================

/// Where the policy goes after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// The attempt succeeded.
    Success,
    /// Waiting before backoff retry number `attempt`.
    Backoff {
        /// 1-based failure count that triggered this wait.
        attempt: u32,
        /// How long to wait.
        delay: Duration,
    },
    /// Waiting the fixed escalation interval.
    EscalatedWait {
        /// 1-based escalation number.
        escalation: u32,
        /// How long to wait.
        delay: Duration,
    },
    /// No more attempts.
    Exhausted,
}

impl RetryState {
    /// Returns the wait this state implies, if any.
    pub fn delay(&self) -> Option<Duration> {
        match self {
            Self::Backoff { delay, .. } | Self::EscalatedWait { delay, .. } => Some(*delay),
            Self::Success | Self::Exhausted => None,
        }
    }
}

/// Record of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// 1-based attempt number.
    pub number: u32,
    /// Error if the attempt failed.
    pub error: Option<FetchError>,
    /// Transition taken after the attempt.
    pub next: RetryState,
}

// ============================================================================
// Outcome
// ============================================================================

/// The outcome of running an operation under the policy.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// The result (success or terminal error).
    pub result: Result<T, RetryError>,
    /// All attempts made.
    pub attempts: Vec<AttemptRecord>,
}

impl<T> RetryOutcome<T> {
    /// Returns true if the operation eventually succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Returns the number of attempts made.
    pub fn attempts_count(&self) -> u32 {
        u32::try_from(self.attempts.len()).unwrap_or(u32::MAX)
    }

    /// Returns every wait taken, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.attempts.iter().filter_map(|a| a.next.delay()).collect()
    }

    /// Returns the number of backoff waits taken.
    pub fn backoff_count(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| matches!(a.next, RetryState::Backoff { .. }))
            .count()
    }

    /// Returns the number of escalated waits taken.
    pub fn escalation_count(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| matches!(a.next, RetryState::EscalatedWait { .. }))
            .count()
    }

    /// Discards the attempt log.
    pub fn into_result(self) -> Result<T, RetryError> {
        self.result
    }
}

// ============================================================================
// Policy
// ============================================================================

/// Bounded retry policy: exponential backoff, then a fixed number of long
/// escalated waits, then exhaustion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of backoff retries.
    pub max_retries: u32,
    /// Base delay; retry `n` waits `base_delay * 2^(n-1)`.
    pub base_delay: Duration,
    /// Fixed wait once backoff retries are used up.
    pub escalation_delay: Duration,
    /// Maximum number of escalated waits before giving up.
    pub max_escalations: u32,
}

impl RetryPolicy {
    /// Creates a policy with `max_retries` backoff retries and default delays.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: DEFAULT_BASE_DELAY,
            escalation_delay: DEFAULT_ESCALATION_DELAY,
            max_escalations: DEFAULT_MAX_ESCALATIONS,
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            escalation_delay: Duration::ZERO,
            max_escalations: 0,
        }
    }

    /// Sets the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the escalation wait and how many times it may be taken.
    pub fn with_escalation(mut self, delay: Duration, max_escalations: u32) -> Self {
        self.escalation_delay = delay;
        self.max_escalations = max_escalations;
        self
    }

    /// Maximum number of requests this policy will ever make.
    pub fn max_attempts(&self) -> u32 {
        1 + self.max_retries + self.max_escalations
    }

    /// Calculates the backoff delay before retry number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Transition after the `failures`-th consecutive retryable failure.
    pub fn after_failure(&self, failures: u32) -> RetryState {
        if failures <= self.max_retries {
            return RetryState::Backoff {
                attempt: failures,
                delay: self.delay_for_attempt(failures),
            };
        }

        let escalation = failures - self.max_retries;
        if escalation <= self.max_escalations {
            RetryState::EscalatedWait {
                escalation,
                delay: self.escalation_delay,
            }
        } else {
            RetryState::Exhausted
        }
    }

    /// Runs `operation` until it succeeds, fails hard, or the budget is spent.
    ///
    /// Only [`FetchError::is_retryable`] errors are retried. Every wait goes
    /// through `sleeper`.
    pub async fn run<T, F, Fut, S>(&self, sleeper: &S, label: &str, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
        S: Sleeper + ?Sized,
    {
        let mut attempts = Vec::new();
        let mut failures = 0u32;
        let mut escalations = 0u32;

        loop {
            let number = failures + 1;
            debug!(unit = %label, attempt = number, "Attempting request");

            let error = match operation().await {
                Ok(value) => {
                    attempts.push(AttemptRecord {
                        number,
                        error: None,
                        next: RetryState::Success,
                    });
                    return RetryOutcome {
                        result: Ok(value),
                        attempts,
                    };
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                warn!(unit = %label, attempt = number, error = %error, "Non-retryable failure");
                attempts.push(AttemptRecord {
                    number,
                    error: Some(error.clone()),
                    next: RetryState::Exhausted,
                });
                return RetryOutcome {
                    result: Err(RetryError::NonRetryable(error)),
                    attempts,
                };
            }

            failures += 1;
            let next = self.after_failure(failures);
            attempts.push(AttemptRecord {
                number,
                error: Some(error.clone()),
                next,
            });

            match next {
                RetryState::Backoff { attempt, delay } => {
                    warn!(
                        unit = %label,
                        attempt,
                        max_retries = self.max_retries,
                        delay_secs = delay.as_secs(),
                        error = %error,
                        "Request failed, backing off"
                    );
                    sleeper.sleep(delay).await;
                }
                RetryState::EscalatedWait { escalation, delay } => {
                    escalations = escalation;
                    warn!(
                        unit = %label,
                        escalation,
                        max_escalations = self.max_escalations,
                        delay_secs = delay.as_secs(),
                        error = %error,
                        "Backoff exhausted, escalated wait"
                    );
                    sleeper.sleep(delay).await;
                }
                RetryState::Exhausted | RetryState::Success => {
                    warn!(unit = %label, attempts = number, error = %error, "Retry budget exhausted");
                    return RetryOutcome {
                        result: Err(RetryError::Exhausted {
                            attempts: number,
                            escalations,
                            last: error,
                        }),
                        attempts,
                    };
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingSleeper;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn scripted(
        responses: Vec<Result<u32, FetchError>>,
    ) -> (Mutex<VecDeque<Result<u32, FetchError>>>, Mutex<u32>) {
        (Mutex::new(responses.into()), Mutex::new(0))
    }

    fn transient() -> Result<u32, FetchError> {
        Err(FetchError::Transient("connection reset".into()))
    }

    fn rate_limited() -> Result<u32, FetchError> {
        Err(FetchError::RateLimited { retry_after: None })
    }

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::default().with_base_delay(Duration::from_secs(1));

        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(8));
    }

    #[test]
    fn test_transitions() {
        let policy = RetryPolicy::new(2)
            .with_base_delay(Duration::from_secs(5))
            .with_escalation(Duration::from_secs(600), 1);

        assert_eq!(
            policy.after_failure(1),
            RetryState::Backoff { attempt: 1, delay: Duration::from_secs(5) }
        );
        assert_eq!(
            policy.after_failure(2),
            RetryState::Backoff { attempt: 2, delay: Duration::from_secs(10) }
        );
        assert_eq!(
            policy.after_failure(3),
            RetryState::EscalatedWait { escalation: 1, delay: Duration::from_secs(600) }
        );
        assert_eq!(policy.after_failure(4), RetryState::Exhausted);
        assert_eq!(policy.max_attempts(), 4);
    }

    #[tokio::test]
    async fn test_succeeds_immediately() {
        let sleeper = RecordingSleeper::new();
        let outcome = RetryPolicy::default()
            .run(&sleeper, "test", || async { Ok::<_, FetchError>(42) })
            .await;

        assert_eq!(outcome.result, Ok(42));
        assert_eq!(outcome.attempts_count(), 1);
        assert!(sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_delays_are_deterministic() {
        let policy = RetryPolicy::new(5).with_base_delay(Duration::from_secs(3));
        let (queue, _) = scripted(vec![transient(), rate_limited(), transient(), Ok(7)]);
        let sleeper = RecordingSleeper::new();

        let outcome = policy
            .run(&sleeper, "test", || {
                let next = queue.lock().unwrap().pop_front().unwrap();
                async move { next }
            })
            .await;

        assert_eq!(outcome.result, Ok(7));
        assert_eq!(outcome.backoff_count(), 3);
        let expected: Vec<Duration> = (1..=3).map(|k| Duration::from_secs(3 * 2u64.pow(k - 1))).collect();
        assert_eq!(outcome.delays(), expected);
        assert_eq!(sleeper.sleeps(), expected);
    }

    #[tokio::test]
    async fn test_escalates_then_exhausts() {
        let policy = RetryPolicy::new(2)
            .with_base_delay(Duration::from_secs(1))
            .with_escalation(Duration::from_secs(600), 2);
        let sleeper = RecordingSleeper::new();
        let (_, calls) = scripted(Vec::new());

        let outcome = policy
            .run(&sleeper, "test", || {
                *calls.lock().unwrap() += 1;
                async { rate_limited() }
            })
            .await;

        assert_eq!(*calls.lock().unwrap(), policy.max_attempts());
        assert_eq!(outcome.escalation_count(), 2);
        assert_eq!(
            sleeper.sleeps(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(600),
                Duration::from_secs(600),
            ]
        );
        assert_eq!(sleeper.total(), Duration::from_secs(1203));
        match outcome.result {
            Err(RetryError::Exhausted { attempts, escalations, last }) => {
                assert_eq!(attempts, 5);
                assert_eq!(escalations, 2);
                assert!(matches!(last, FetchError::RateLimited { .. }));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_recovers_during_escalation() {
        let policy = RetryPolicy::new(1)
            .with_base_delay(Duration::from_secs(1))
            .with_escalation(Duration::from_secs(60), 3);
        let (queue, _) = scripted(vec![transient(), transient(), Ok(1)]);
        let sleeper = RecordingSleeper::new();

        let outcome = policy
            .run(&sleeper, "test", || {
                let next = queue.lock().unwrap().pop_front().unwrap();
                async move { next }
            })
            .await;

        assert!(outcome.is_success());
        assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(1), Duration::from_secs(60)]);
    }

    #[tokio::test]
    async fn test_hard_error_is_not_retried() {
        let sleeper = RecordingSleeper::new();
        let outcome = RetryPolicy::default()
            .run(&sleeper, "test", || async {
                Err::<u32, _>(FetchError::Hard("missing pageProps".into()))
            })
            .await;

        assert_eq!(outcome.attempts_count(), 1);
        assert!(sleeper.sleeps().is_empty());
        assert!(matches!(outcome.result, Err(RetryError::NonRetryable(FetchError::Hard(_)))));
    }

    #[tokio::test]
    async fn test_no_retry_policy_exhausts_on_first_failure() {
        let sleeper = RecordingSleeper::new();
        let outcome = RetryPolicy::no_retry()
            .run(&sleeper, "test", || async { transient() })
            .await;

        assert_eq!(outcome.attempts_count(), 1);
        assert!(matches!(outcome.result, Err(RetryError::Exhausted { attempts: 1, .. })));
    }
}
