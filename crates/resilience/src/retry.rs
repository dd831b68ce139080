// crates/resilience/src/retry.rs
//! Retry policies with exponential backoff

use std::future::Future;
use std::time::Duration;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first attempt)
    max_attempts: usize,
    /// Initial delay between retries
    initial_delay: Duration,
    /// Maximum delay between retries
    max_delay: Duration,
    /// Backoff multiplier
    multiplier: f64,
    /// Whether to use jitter
    use_jitter: bool,
}

impl RetryPolicy {
    /// Creates a new retry policy
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            use_jitter: true,
        }
    }

    /// Policy used for server requests: three retries after the first
    /// attempt, waiting 1s, 2s and 4s in between.
    pub fn backoff() -> Self {
        Self::with_max_retries(3)
            .with_initial_delay(Duration::from_secs(1))
            .with_multiplier(2.0)
            .with_jitter(false)
    }

    /// Creates a policy allowing `max_retries` retries after the first attempt
    pub fn with_max_retries(max_retries: usize) -> Self {
        Self::new(max_retries + 1)
    }

    /// Sets the initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets whether to use jitter
    pub fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Calculates the delay to wait after the given (1-based) failed attempt
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::from_secs(0);
        }

        let base_delay = self.initial_delay.as_millis() as f64
            * self.multiplier.powi((attempt - 1) as i32);

        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.use_jitter {
            // Add up to 25% jitter
            let jitter_factor = 0.75 + (attempt as f64 * 0.1 % 0.25);
            capped_delay * jitter_factor
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }

    /// Returns the maximum number of attempts
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Returns the number of retries allowed after the first attempt
    pub fn max_retries(&self) -> usize {
        self.max_attempts.saturating_sub(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::backoff()
    }
}

/// A value produced by [`with_retry`] together with the attempts it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: usize,
}

/// Why [`with_retry`] gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryFailure<E> {
    /// The operation failed with an error the classifier rejected for retry
    Terminal { error: E, attempts: usize },
    /// Every attempt failed with a retryable error
    Exhausted { error: E, attempts: usize },
    /// The policy allows zero attempts, so nothing ran
    NoAttempts,
}

impl<E> RetryFailure<E> {
    /// Number of attempts made before giving up
    pub fn attempts(&self) -> usize {
        match self {
            RetryFailure::Terminal { attempts, .. } | RetryFailure::Exhausted { attempts, .. } => {
                *attempts
            }
            RetryFailure::NoAttempts => 0,
        }
    }
}

/// Runs `operation` until it succeeds, fails with an error `is_retryable`
/// rejects, or the policy's attempts are used up.
///
/// The operation receives the 1-based attempt number. Between attempts the
/// task sleeps for [`RetryPolicy::delay_for_attempt`] without blocking the
/// runtime.
pub async fn with_retry<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    mut operation: F,
    is_retryable: P,
) -> Result<Attempted<T>, RetryFailure<E>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    for attempt in 1..=policy.max_attempts() {
        match operation(attempt).await {
            Ok(value) => return Ok(Attempted { value, attempts: attempt }),
            Err(error) if !is_retryable(&error) => {
                return Err(RetryFailure::Terminal {
                    error,
                    attempts: attempt,
                });
            }
            Err(error) => {
                if attempt >= policy.max_attempts() {
                    return Err(RetryFailure::Exhausted {
                        error,
                        attempts: attempt,
                    });
                }

                let delay = policy.delay_for_attempt(attempt);
                log::debug!("Attempt {} failed, retrying in {:?}", attempt, delay);
                tokio::time::sleep(delay).await;
            }
        }
    }

    Err(RetryFailure::NoAttempts)
}
