//! # Bootstrap Coordination
//!
//! Brings the Safe to readiness: three stages run fully in parallel —
//! identity acquisition, root key materialization, and server startup —
//! racing a single timeout. Each stage signals completion at most once; a
//! single monitor loop fans the signals in. Only when all three have fired
//! does the coordinator transition to READY and flip the external readiness
//! probe. If the timeout fires first, or a stage hits an unrecoverable
//! condition, the outcome is FATAL and the process must exit so the
//! orchestrator restarts it. There is no partial-readiness state.

pub mod identity;
pub mod persist;

pub use identity::{FileIdentityProvider, IdentityHandle, IdentityProvider};
pub use persist::{KeyPersistence, SecretStorePersistence};

use crate::config::SharedSafeConfig;
use crate::crypto::{random_string, KeyStore};
use crate::observability::metrics;
use crate::retry::Strategy;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Why bootstrap failed; the process must terminate on any of these
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FatalReason {
    #[error("failed to complete bootstrap in a timely manner ({remaining} operations outstanding)")]
    Timeout { remaining: u8 },

    #[error("root key not mounted at {path}")]
    MissingKeyMount { path: String },

    #[error("root key mount at {path} is unreadable: {message}")]
    KeyMountUnreadable { path: String, message: String },

    #[error("mounted root key is malformed: {message}")]
    MalformedKey { message: String },

    #[error("failed to generate root key material: {message}")]
    KeyGenerationFailed { message: String },

    #[error("failed to persist root key to the backing store: {message}")]
    PersistFailed { message: String },
}

/// Terminal result of the bootstrap state machine
#[derive(Debug, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// All three stages completed; the store may serve
    Ready,
    /// Bootstrap cannot complete; the supervisor must exit the process
    Fatal(FatalReason),
}

/// Sending halves of the bootstrap completion signals
#[derive(Debug, Clone)]
pub struct SignalSenders {
    pub identity_acquired: mpsc::Sender<()>,
    pub key_materialized: mpsc::Sender<()>,
    pub server_started: mpsc::Sender<()>,
    pub fatal: mpsc::Sender<FatalReason>,
}

/// Receiving halves consumed by the monitor loop
#[derive(Debug)]
pub struct SignalReceivers {
    pub identity_acquired: mpsc::Receiver<()>,
    pub key_materialized: mpsc::Receiver<()>,
    pub server_started: mpsc::Receiver<()>,
    pub fatal: mpsc::Receiver<FatalReason>,
}

/// Create the one-shot completion signal set
///
/// Channels are buffered so a stage can signal and finish without waiting
/// on the monitor.
pub fn signal_channels() -> (SignalSenders, SignalReceivers) {
    let (identity_tx, identity_rx) = mpsc::channel(1);
    let (key_tx, key_rx) = mpsc::channel(1);
    let (server_tx, server_rx) = mpsc::channel(1);
    let (fatal_tx, fatal_rx) = mpsc::channel(1);
    (
        SignalSenders {
            identity_acquired: identity_tx,
            key_materialized: key_tx,
            server_started: server_tx,
            fatal: fatal_tx,
        },
        SignalReceivers {
            identity_acquired: identity_rx,
            key_materialized: key_rx,
            server_started: server_rx,
            fatal: fatal_rx,
        },
    )
}

/// Wait for all three completion signals, or a timeout, or a fatal report
///
/// Each signal is counted at most once; duplicate fires are no-ops. When
/// the count reaches zero the coordinator is READY: `on_ready` runs exactly
/// once and the monitor returns. A timeout with operations outstanding, or
/// any fatal report, ends the bootstrap with [`BootstrapOutcome::Fatal`].
pub async fn monitor(
    correlation_id: &str,
    mut signals: SignalReceivers,
    timeout: std::time::Duration,
    on_ready: impl FnOnce(),
) -> BootstrapOutcome {
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let mut remaining: u8 = 3;
    let mut identity_counted = false;
    let mut key_counted = false;
    let mut server_counted = false;
    let mut fatal_open = true;

    loop {
        tokio::select! {
            () = &mut deadline => {
                error!(
                    "[{}] Failed to complete bootstrap in a timely manner; {} operations outstanding",
                    correlation_id, remaining
                );
                return BootstrapOutcome::Fatal(FatalReason::Timeout { remaining });
            }
            reason = signals.fatal.recv(), if fatal_open => {
                match reason {
                    Some(reason) => {
                        error!("[{}] Bootstrap stage failed fatally: {}", correlation_id, reason);
                        return BootstrapOutcome::Fatal(reason);
                    }
                    // All stage tasks finished without reporting; nothing
                    // more can arrive on this channel.
                    None => fatal_open = false,
                }
            }
            signal = signals.identity_acquired.recv(), if !identity_counted => {
                identity_counted = true;
                if signal.is_some() {
                    info!("[{}] Acquired identity.", correlation_id);
                    metrics::increment_bootstrap_signal("identity");
                    remaining -= 1;
                    info!("[{}] remaining operations before ready: {}", correlation_id, remaining);
                }
            }
            signal = signals.key_materialized.recv(), if !key_counted => {
                key_counted = true;
                if signal.is_some() {
                    debug!("[{}] Root key materialized.", correlation_id);
                    metrics::increment_bootstrap_signal("root-key");
                    remaining -= 1;
                    info!("[{}] remaining operations before ready: {}", correlation_id, remaining);
                }
            }
            signal = signals.server_started.recv(), if !server_counted => {
                server_counted = true;
                if signal.is_some() {
                    debug!("[{}] Server ready.", correlation_id);
                    metrics::increment_bootstrap_signal("server");
                    remaining -= 1;
                    info!("[{}] remaining operations before ready: {}", correlation_id, remaining);
                }
            }
        }

        if remaining == 0 {
            debug!("[{}] Creating readiness probe.", correlation_id);
            metrics::mark_bootstrap_ready();
            on_ready();
            info!("[{}] Safe is ready to serve.", correlation_id);
            return BootstrapOutcome::Ready;
        }
    }
}

/// Orchestrates the three bootstrap stages against the shared timeout
#[derive(Debug)]
pub struct BootstrapCoordinator {
    config: SharedSafeConfig,
    keys: Arc<KeyStore>,
    identity_provider: Arc<dyn IdentityProvider>,
    persistence: Arc<dyn KeyPersistence>,
    retry_strategy: Strategy,
    cancel: CancellationToken,
}

impl BootstrapCoordinator {
    pub fn new(
        config: SharedSafeConfig,
        keys: Arc<KeyStore>,
        identity_provider: Arc<dyn IdentityProvider>,
        persistence: Arc<dyn KeyPersistence>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            keys,
            identity_provider,
            persistence,
            retry_strategy: Strategy {
                exponential: true,
                ..Strategy::default()
            },
            cancel,
        }
    }

    /// Override the backoff used for the identity-provider retries
    pub fn with_retry_strategy(mut self, strategy: Strategy) -> Self {
        self.retry_strategy = strategy;
        self
    }

    /// Run bootstrap to completion
    ///
    /// The server stage is owned by the caller (the listener is bound in the
    /// runtime); its completion arrives through `server_started`. `on_ready`
    /// flips the external readiness signal and runs exactly once.
    pub async fn run(
        &self,
        server_started: mpsc::Receiver<()>,
        on_ready: impl FnOnce(),
    ) -> BootstrapOutcome {
        let correlation_id = random_string(8);
        info!("[{}] Bootstrapping...", correlation_id);

        let (senders, mut receivers) = signal_channels();
        receivers.server_started = server_started;

        tokio::spawn(identity::acquire_identity(
            correlation_id.clone(),
            Arc::clone(&self.identity_provider),
            self.config.identity_role_pattern.clone(),
            self.retry_strategy,
            senders.identity_acquired,
            self.cancel.clone(),
        ));

        tokio::spawn(persist::materialize_root_key(
            correlation_id.clone(),
            Arc::clone(&self.config),
            Arc::clone(&self.keys),
            Arc::clone(&self.persistence),
            senders.key_materialized,
            senders.fatal,
        ));

        // The senders for the stages above have been moved into the tasks;
        // drop the remaining local handle so channel closure tracks the
        // stage tasks alone.
        drop(senders.server_started);

        monitor(
            &correlation_id,
            receivers,
            self.config.bootstrap_timeout(),
            on_ready,
        )
        .await
    }
}
