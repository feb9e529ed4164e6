//! # Retry Configuration
//!
//! Default backoff behavior for retried remote operations, loaded from
//! environment variables.

use crate::config::safe::env_var_or_default;
use crate::constants;
use crate::retry::Strategy;
use std::time::Duration;

/// Retry defaults applied to remote operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries before giving up (inclusive)
    pub max_retries: u32,
    /// Delay between retries (fixed mode) or jitter bound (exponential mode),
    /// in milliseconds
    pub delay_ms: u64,
    /// Backoff mode: "exponential" or "fixed"
    pub mode: String,
    /// Cap on any single wait (milliseconds)
    pub max_wait_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: constants::DEFAULT_RETRY_MAX_RETRIES,
            delay_ms: constants::DEFAULT_RETRY_DELAY_MS,
            mode: "exponential".to_string(),
            max_wait_ms: constants::DEFAULT_RETRY_MAX_DURATION_MS,
        }
    }
}

impl RetryConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: env_var_or_default("SAFE_BACKOFF_MAX_RETRIES", defaults.max_retries),
            delay_ms: env_var_or_default("SAFE_BACKOFF_DELAY_MS", defaults.delay_ms),
            mode: env_var_or_default("SAFE_BACKOFF_MODE", defaults.mode),
            max_wait_ms: env_var_or_default("SAFE_BACKOFF_MAX_WAIT_MS", defaults.max_wait_ms),
        }
    }

    /// The retry strategy these settings describe
    pub fn strategy(&self) -> Strategy {
        Strategy {
            max_retries: self.max_retries,
            delay: Duration::from_millis(self.delay_ms),
            exponential: self.mode == "exponential",
            max_duration: Duration::from_millis(self.max_wait_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_is_exponential() {
        let strategy = RetryConfig::default().strategy();
        assert!(strategy.exponential);
        assert_eq!(strategy.max_retries, 5);
        assert_eq!(strategy.delay, Duration::from_millis(1000));
    }

    #[test]
    fn fixed_mode_disables_exponential_backoff() {
        let config = RetryConfig {
            mode: "fixed".to_string(),
            ..RetryConfig::default()
        };
        assert!(!config.strategy().exponential);
    }
}
