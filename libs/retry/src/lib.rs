//! Retry primitives for calls into remote platform services.
//!
//! A [`RetryPolicy`] wraps a single operation and decides, per failure,
//! whether to try again:
//!
//! - The policy's predicate classifies each error as retryable or fatal
//! - Retryable failures sleep for [`BackoffSchedule::delay`] and re-invoke
//! - At most `max_attempts` calls are made in total
//!
//! # Invariants
//!
//! - A successful attempt is never followed by another call
//! - Fatal errors are returned as-is after the attempt that produced them
//! - `max_attempts` is at least 1

mod backoff;
mod policy;

pub use backoff::BackoffSchedule;
pub use policy::{RetryError, RetryPolicy};

use std::time::Duration;

/// Default total number of attempts, including the first call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(100);

/// Default upper bound on a single backoff delay.
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(5);

/// Default jitter factor applied to each delay.
pub const DEFAULT_BACKOFF_JITTER: f64 = 0.25;
