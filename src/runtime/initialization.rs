//! # Initialization
//!
//! Safe runtime initialization: rustls setup, tracing, metrics
//! registration, configuration load, key store and cipher construction,
//! and probe server startup.

use crate::config::{load_config, PollConfig, RetryConfig, SharedSafeConfig};
use crate::crypto::{EnvelopeCipher, KeyStore};
use crate::observability::metrics;
use crate::server::{start_server, ServerState};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Initialization result containing all components the supervisor needs
#[derive(Debug)]
pub struct InitializationResult {
    /// Safe configuration, shared across components
    pub config: SharedSafeConfig,
    /// Adaptive poller configuration for watcher loops
    pub poll_config: PollConfig,
    /// Default backoff for retried remote operations
    pub retry_config: RetryConfig,
    /// Owner of the process root key material
    pub keys: Arc<KeyStore>,
    /// Envelope encryption engine
    pub cipher: Arc<EnvelopeCipher>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    /// Fires once the probe listener is bound; consumed by the bootstrap
    /// monitor as the server-started signal
    pub server_started: mpsc::Receiver<()>,
    /// Shutdown token threaded through every retry loop
    pub cancel: CancellationToken,
}

/// Initialize the Safe runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - Configuration load
/// - Key store and cipher construction
/// - Probe server startup (in a background task)
pub async fn initialize() -> Result<InitializationResult> {
    // Configure rustls crypto provider FIRST, before any other operations.
    // Required for rustls 0.23+ when no default provider is set via features.
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "secrets_safe=info".into()),
        )
        .init();

    info!("Starting Secrets Safe");

    metrics::register_metrics().context("Failed to register metrics")?;

    let (safe_config, poll_config, retry_config) = load_config();
    let config: SharedSafeConfig = Arc::new(safe_config);

    let keys = Arc::new(KeyStore::new());
    let cipher = Arc::new(EnvelopeCipher::new(
        Arc::clone(&keys),
        config.fips_compliant,
        config.iv_init_interval(),
    ));

    let server_state = Arc::new(ServerState::new());
    let (started_tx, started_rx) = mpsc::channel(1);

    // The bootstrap monitor consumes the started signal; readiness stays
    // false until the coordinator reaches READY.
    let server_port = config.probe_port;
    let server_state_clone = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone, started_tx).await {
            error!("HTTP server error: {}", e);
        }
    });

    Ok(InitializationResult {
        config,
        poll_config,
        retry_config,
        keys,
        cipher,
        server_state,
        server_started: started_rx,
        cancel: CancellationToken::new(),
    })
}
