//! # Poll Configuration
//!
//! Thresholds and bounds for the adaptive poller used by sidecar and
//! init-container polling loops.

use crate::config::safe::env_var_or_default;
use crate::constants;
use std::time::Duration;

/// Adaptive poller configuration
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Initial (and minimum) poll interval (milliseconds)
    pub poll_interval_ms: u64,
    /// Maximum poll interval (milliseconds)
    pub max_poll_interval_ms: u64,
    /// Multiplier applied when a streak threshold is reached
    pub backoff_multiplier: u64,
    /// Consecutive successes required before the interval shrinks
    pub success_threshold: u64,
    /// Consecutive errors required before the interval expands
    pub error_threshold: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: constants::DEFAULT_POLL_INTERVAL_MS,
            max_poll_interval_ms: constants::DEFAULT_MAX_POLL_INTERVAL_MS,
            backoff_multiplier: constants::DEFAULT_POLL_BACKOFF_MULTIPLIER,
            success_threshold: constants::DEFAULT_POLL_SUCCESS_THRESHOLD,
            error_threshold: constants::DEFAULT_POLL_ERROR_THRESHOLD,
        }
    }
}

impl PollConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval_ms: env_var_or_default("SAFE_POLL_INTERVAL_MS", defaults.poll_interval_ms),
            max_poll_interval_ms: env_var_or_default(
                "SAFE_MAX_POLL_INTERVAL_MS",
                defaults.max_poll_interval_ms,
            ),
            backoff_multiplier: env_var_or_default(
                "SAFE_POLL_BACKOFF_MULTIPLIER",
                defaults.backoff_multiplier,
            ),
            success_threshold: env_var_or_default(
                "SAFE_POLL_SUCCESS_THRESHOLD",
                defaults.success_threshold,
            ),
            error_threshold: env_var_or_default(
                "SAFE_POLL_ERROR_THRESHOLD",
                defaults.error_threshold,
            ),
        }
    }

    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms)
    }
}
