//! Configuration for the scheduler client.

use std::time::Duration;

use plfm_retry::{
    BackoffSchedule, RetryPolicy, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_JITTER,
    DEFAULT_BACKOFF_MAX, DEFAULT_MAX_ATTEMPTS,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ClientError;

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Scheduler client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerClientConfig {
    /// Total attempts for `select_destinations`, including the first call.
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    pub retry_base_ms: u64,

    /// Upper bound on a single retry delay, in milliseconds.
    pub retry_max_ms: u64,

    /// Jitter factor applied to retry delays (0.0 to 1.0).
    pub retry_jitter: f64,
}

impl Default for SchedulerClientConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_ms: DEFAULT_BACKOFF_BASE.as_millis() as u64,
            retry_max_ms: DEFAULT_BACKOFF_MAX.as_millis() as u64,
            retry_jitter: DEFAULT_BACKOFF_JITTER,
        }
    }
}

impl SchedulerClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_attempts = parse_or(
            &lookup,
            "PLFM_SCHEDULER_MAX_ATTEMPTS",
            defaults.max_attempts,
        )?;
        let retry_base_ms = parse_or(
            &lookup,
            "PLFM_SCHEDULER_RETRY_BASE_MS",
            defaults.retry_base_ms,
        )?;
        let retry_max_ms = parse_or(
            &lookup,
            "PLFM_SCHEDULER_RETRY_MAX_MS",
            defaults.retry_max_ms,
        )?;
        let retry_jitter = parse_or(
            &lookup,
            "PLFM_SCHEDULER_RETRY_JITTER",
            defaults.retry_jitter,
        )?;

        let config = Self {
            max_attempts,
            retry_base_ms,
            retry_max_ms,
            retry_jitter,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "PLFM_SCHEDULER_MAX_ATTEMPTS",
                value: self.max_attempts.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.retry_jitter) {
            return Err(ConfigError::Invalid {
                key: "PLFM_SCHEDULER_RETRY_JITTER",
                value: self.retry_jitter.to_string(),
                reason: "must be between 0.0 and 1.0".to_string(),
            });
        }
        if self.retry_max_ms < self.retry_base_ms {
            return Err(ConfigError::Invalid {
                key: "PLFM_SCHEDULER_RETRY_MAX_MS",
                value: self.retry_max_ms.to_string(),
                reason: format!("must not be below the base delay ({} ms)", self.retry_base_ms),
            });
        }
        Ok(())
    }

    pub fn backoff(&self) -> BackoffSchedule {
        BackoffSchedule {
            base: Duration::from_millis(self.retry_base_ms),
            max: Duration::from_millis(self.retry_max_ms),
            jitter: self.retry_jitter,
            ..BackoffSchedule::default()
        }
    }

    /// Retry policy for `select_destinations`, classifying errors with
    /// [`ClientError::is_retryable`].
    pub fn retry_policy(&self) -> RetryPolicy<ClientError> {
        RetryPolicy::new(self.max_attempts, self.backoff(), ClientError::is_retryable)
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
