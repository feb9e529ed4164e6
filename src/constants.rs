//! # Constants
//!
//! Compile-time defaults for the Safe runtime. Every value here can be
//! overridden through the environment variables read in [`crate::config`].

/// HTTP server port for metrics and health probes
pub const DEFAULT_PROBE_PORT: u16 = 8081;

/// How long the bootstrap coordinator waits for all three readiness signals
/// before declaring the process dead (milliseconds)
pub const DEFAULT_BOOTSTRAP_TIMEOUT_MS: u64 = 300_000;

/// Minimum interval between AES IV generations (milliseconds)
///
/// Encrypting faster than this is rejected outright: a hot encryption loop
/// degrades IV randomness, which weakens the stream cipher when combined
/// with other attack vectors.
pub const DEFAULT_IV_INIT_INTERVAL_MS: u64 = 50;

/// Where the root key Kubernetes Secret is mounted inside the pod
pub const DEFAULT_ROOT_KEY_PATH: &str = "/key/key.txt";

/// Name of the Kubernetes Secret that backs the root key
pub const DEFAULT_ROOT_KEY_SECRET_NAME: &str = "safe-root-key";

/// Namespace the Safe system components live in
pub const DEFAULT_SAFE_NAMESPACE: &str = "safe-system";

/// Field inside the root key Secret that holds the serialized triplet
pub const ROOT_KEY_FIELD: &str = "KEY_TXT";

/// Placeholder content of a root key Secret that has not been initialized yet
pub const BLANK_ROOT_KEY: &str = "{}";

/// Separator joining the three parts of a serialized root key collection
pub const ROOT_KEY_SEPARATOR: &str = "\n";

/// Expected SPIFFE ID pattern for the Safe workload identity
pub const DEFAULT_IDENTITY_ROLE_PATTERN: &str = "^spiffe://[^/]+/workload/safe(/.*)?$";

/// Where the workload identity document is projected inside the pod
pub const DEFAULT_IDENTITY_PATH: &str = "/spiffe-workload-api/identity";

// Retry defaults (see `crate::retry::Strategy`)
pub const DEFAULT_RETRY_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_RETRY_MAX_DURATION_MS: u64 = 10_000;

// Adaptive poller defaults (see `crate::poller`)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 20_000;
pub const DEFAULT_MAX_POLL_INTERVAL_MS: u64 = 300_000;
pub const DEFAULT_POLL_BACKOFF_MULTIPLIER: u64 = 2;
pub const DEFAULT_POLL_SUCCESS_THRESHOLD: u64 = 3;
pub const DEFAULT_POLL_ERROR_THRESHOLD: u64 = 3;
