//! Configuration for the event state store.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration rejected by [`LotteryConfig::validate`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `LOTTERY_MAX_ATTEMPTS` must allow at least one attempt.
    #[error("max_attempts must be at least 1")]
    NoAttempts,
    /// `LOTTERY_STORE_TIMEOUT_MS` must be positive.
    #[error("store_timeout_ms must be greater than 0")]
    ZeroTimeout,
    /// The backoff cap is below the first delay.
    #[error("max_backoff_ms ({max}) is below initial_backoff_ms ({initial})")]
    BackoffInverted {
        /// Configured initial backoff.
        initial: u64,
        /// Configured backoff cap.
        max: u64,
    },
}

/// Event state store configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryConfig {
    /// Attempts per optimistic-concurrency cycle (default: 5)
    pub max_attempts: usize,
    /// Backoff before the first retry, in milliseconds (default: 10)
    pub initial_backoff_ms: u64,
    /// Backoff cap, in milliseconds (default: 500)
    pub max_backoff_ms: u64,
    /// Bound on each document-store call, in milliseconds (default: 5000)
    pub store_timeout_ms: u64,
    /// Seed for a reproducible lottery; unset means thread-local entropy
    pub rng_seed: Option<u64>,
    /// Log filter (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl LotteryConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its
    /// value.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            max_attempts: lookup("LOTTERY_MAX_ATTEMPTS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            initial_backoff_ms: lookup("LOTTERY_INITIAL_BACKOFF_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            max_backoff_ms: lookup("LOTTERY_MAX_BACKOFF_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(500),
            store_timeout_ms: lookup("LOTTERY_STORE_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
            rng_seed: lookup("LOTTERY_RNG_SEED").and_then(|s| s.parse().ok()),
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        }
    }

    /// Check the values for consistency.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        if self.store_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(ConfigError::BackoffInverted {
                initial: self.initial_backoff_ms,
                max: self.max_backoff_ms,
            });
        }
        Ok(())
    }

    /// Retry policy for conflict retries.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_attempts(self.max_attempts)
            .initial_delay(Duration::from_millis(self.initial_backoff_ms))
            .max_delay(Duration::from_millis(self.max_backoff_ms))
            .build()
    }

    /// Bound on each document-store call.
    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
