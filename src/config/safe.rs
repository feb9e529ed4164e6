//! # Safe Configuration
//!
//! Settings for the Safe store and its bootstrap, loaded from environment
//! variables. All settings have sensible defaults and can be overridden via
//! environment variables populated from a ConfigMap using `envFrom` in the
//! deployment.

use crate::constants;
use std::time::Duration;

/// Safe store configuration
#[derive(Debug, Clone)]
pub struct SafeConfig {
    /// Selects the symmetric AES path instead of the default sealed path
    pub fips_compliant: bool,
    /// Minimum interval between AES IV generations (milliseconds)
    pub iv_init_interval_ms: u64,
    /// How long bootstrap may take before the process gives up (milliseconds)
    pub bootstrap_timeout_ms: u64,
    /// Path the root key Secret is mounted at inside the pod
    pub root_key_path: String,
    /// Name of the Kubernetes Secret backing the root key
    pub root_key_secret_name: String,
    /// Namespace the Safe system components live in
    pub namespace: String,
    /// Manual key input: the operator provides the root key out-of-band and
    /// the materialization stage does not generate or load anything
    pub manual_key_input: bool,
    /// HTTP server port for metrics and health probes
    pub probe_port: u16,
    /// Pattern the acquired workload identity must match
    pub identity_role_pattern: String,
    /// Path the workload identity document is projected at
    pub identity_path: String,
}

impl Default for SafeConfig {
    fn default() -> Self {
        Self {
            fips_compliant: false,
            iv_init_interval_ms: constants::DEFAULT_IV_INIT_INTERVAL_MS,
            bootstrap_timeout_ms: constants::DEFAULT_BOOTSTRAP_TIMEOUT_MS,
            root_key_path: constants::DEFAULT_ROOT_KEY_PATH.to_string(),
            root_key_secret_name: constants::DEFAULT_ROOT_KEY_SECRET_NAME.to_string(),
            namespace: constants::DEFAULT_SAFE_NAMESPACE.to_string(),
            manual_key_input: false,
            probe_port: constants::DEFAULT_PROBE_PORT,
            identity_role_pattern: constants::DEFAULT_IDENTITY_ROLE_PATTERN.to_string(),
            identity_path: constants::DEFAULT_IDENTITY_PATH.to_string(),
        }
    }
}

impl SafeConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            fips_compliant: env_flag("SAFE_FIPS_COMPLIANT", defaults.fips_compliant),
            iv_init_interval_ms: env_var_or_default(
                "SAFE_IV_INITIALIZATION_INTERVAL_MS",
                defaults.iv_init_interval_ms,
            ),
            bootstrap_timeout_ms: env_var_or_default(
                "SAFE_BOOTSTRAP_TIMEOUT_MS",
                defaults.bootstrap_timeout_ms,
            ),
            root_key_path: env_var_or_default("SAFE_ROOT_KEY_PATH", defaults.root_key_path),
            root_key_secret_name: env_var_or_default(
                "SAFE_ROOT_KEY_SECRET_NAME",
                defaults.root_key_secret_name,
            ),
            namespace: env_var_or_default("SAFE_NAMESPACE", defaults.namespace),
            manual_key_input: env_flag("SAFE_MANUAL_KEY_INPUT", defaults.manual_key_input),
            probe_port: env_var_or_default("SAFE_PROBE_PORT", defaults.probe_port),
            identity_role_pattern: env_var_or_default(
                "SAFE_IDENTITY_ROLE_PATTERN",
                defaults.identity_role_pattern,
            ),
            identity_path: env_var_or_default("SAFE_IDENTITY_PATH", defaults.identity_path),
        }
    }

    pub fn iv_init_interval(&self) -> Duration {
        Duration::from_millis(self.iv_init_interval_ms)
    }

    pub fn bootstrap_timeout(&self) -> Duration {
        Duration::from_millis(self.bootstrap_timeout_ms)
    }
}

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read a boolean environment variable; accepts "true"/"false"
pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = SafeConfig::default();
        assert!(!config.fips_compliant);
        assert_eq!(config.iv_init_interval(), Duration::from_millis(50));
        assert_eq!(config.bootstrap_timeout(), Duration::from_secs(300));
        assert_eq!(config.root_key_path, "/key/key.txt");
    }

    #[test]
    fn env_var_or_default_falls_back_on_garbage() {
        std::env::set_var("SAFE_TEST_GARBAGE_PORT", "not-a-number");
        let port: u16 = env_var_or_default("SAFE_TEST_GARBAGE_PORT", 1234);
        assert_eq!(port, 1234);
        std::env::remove_var("SAFE_TEST_GARBAGE_PORT");
    }
}
