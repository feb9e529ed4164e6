//! # Configuration
//!
//! Runtime configuration loaded from environment variables (populated from a
//! ConfigMap). All configuration has sensible defaults and can be overridden
//! via environment variables.

mod poll;
mod retry;
mod safe;

pub use poll::PollConfig;
pub use retry::RetryConfig;
pub use safe::SafeConfig;

use std::sync::Arc;

/// Shared Safe configuration, loaded once at startup
pub type SharedSafeConfig = Arc<SafeConfig>;

/// Load configuration from environment variables with defaults
pub fn load_config() -> (SafeConfig, PollConfig, RetryConfig) {
    (
        SafeConfig::from_env(),
        PollConfig::from_env(),
        RetryConfig::from_env(),
    )
}
