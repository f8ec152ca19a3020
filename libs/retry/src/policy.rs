//! Retry policies and the executor loop.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{BackoffSchedule, DEFAULT_MAX_ATTEMPTS};

/// Terminal outcome of a retried operation.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The error was classified as not retryable.
    #[error("{0}")]
    Fatal(E),

    /// Every allowed attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
}

impl<E> RetryError<E> {
    /// The error produced by the final attempt.
    pub fn into_last(self) -> E {
        match self {
            RetryError::Fatal(e) => e,
            RetryError::Exhausted { last, .. } => last,
        }
    }

    /// Returns the attempt count when retries ran out, `None` for fatal errors.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            RetryError::Fatal(_) => None,
            RetryError::Exhausted { attempts, .. } => Some(*attempts),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}

type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Bounded retry policy for one operation.
pub struct RetryPolicy<E> {
    max_attempts: u32,
    backoff: BackoffSchedule,
    is_retryable: Predicate<E>,
}

impl<E> RetryPolicy<E> {
    /// Create a policy. `max_attempts` counts the first call and is raised to 1 if zero.
    pub fn new<P>(max_attempts: u32, backoff: BackoffSchedule, is_retryable: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            is_retryable: Arc::new(is_retryable),
        }
    }

    /// Default attempt cap and backoff with a caller-supplied predicate.
    pub fn with_predicate<P>(is_retryable: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self::new(DEFAULT_MAX_ATTEMPTS, BackoffSchedule::default(), is_retryable)
    }

    /// A single attempt; every error is fatal.
    pub fn no_retry() -> Self {
        Self::new(1, BackoffSchedule::none(), |_| false)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &BackoffSchedule {
        &self.backoff
    }

    pub fn should_retry(&self, error: &E) -> bool {
        (self.is_retryable)(error)
    }

    /// Run `call` until it succeeds, fails fatally, or the attempt cap is hit.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let max_attempts = self.max_attempts;
        let mut attempt = 1u32;

        loop {
            match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation, attempt, max_attempts, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) if !self.should_retry(&error) => {
                    debug!(operation, attempt, error = %error, "Non-retryable failure");
                    return Err(RetryError::Fatal(error));
                }
                Err(error) if attempt >= max_attempts => {
                    warn!(
                        operation,
                        attempts = attempt,
                        error = %error,
                        "Retries exhausted"
                    );
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: error,
                    });
                }
                Err(error) => {
                    let delay = self.backoff.delay(attempt - 1);
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying {} after a retryable failure",
                        operation
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: self.backoff.clone(),
            is_retryable: Arc::clone(&self.is_retryable),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}
