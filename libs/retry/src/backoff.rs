//! Backoff schedules.

use std::time::Duration;

use crate::{DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_JITTER, DEFAULT_BACKOFF_MAX};

/// Exponential backoff between retry attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffSchedule {
    /// Delay before the first retry.
    pub base: Duration,

    /// Maximum delay before jitter is applied.
    pub max: Duration,

    /// Growth factor per retry.
    pub multiplier: f64,

    /// Jitter factor (0.0 to 1.0).
    pub jitter: f64,
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            base: DEFAULT_BACKOFF_BASE,
            max: DEFAULT_BACKOFF_MAX,
            multiplier: 2.0,
            jitter: DEFAULT_BACKOFF_JITTER,
        }
    }
}

impl BackoffSchedule {
    /// Retry immediately.
    pub fn none() -> Self {
        Self::fixed(Duration::ZERO)
    }

    /// Wait the same amount before every retry.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            base: delay,
            max: delay,
            multiplier: 1.0,
            jitter: 0.0,
        }
    }

    /// Delay before retry number `retry` (0 for the first retry).
    pub fn delay(&self, retry: u32) -> Duration {
        if self.base.is_zero() {
            return Duration::ZERO;
        }

        let growth = self.multiplier.max(1.0).powi(retry.min(i32::MAX as u32) as i32);
        let delay_ns = (self.base.as_nanos() as f64 * growth).min(self.max.as_nanos() as f64);

        let jitter = self.jitter.clamp(0.0, 1.0);
        let offset_ns = if jitter > 0.0 {
            delay_ns * jitter * rand::random_range(-1.0..=1.0)
        } else {
            0.0
        };

        Duration::from_nanos((delay_ns + offset_ns).max(0.0).round() as u64)
    }
}
