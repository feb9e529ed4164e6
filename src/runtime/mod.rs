//! # Runtime
//!
//! Initialization and supervision for the Safe process. The supervisor owns
//! the fail-fast contract: a fatal bootstrap outcome terminates the process
//! so the orchestrator restarts it; the system never serves in a degraded
//! or partially-ready mode.

pub mod initialization;

pub use initialization::{initialize, InitializationResult};

use crate::bootstrap::{
    BootstrapCoordinator, BootstrapOutcome, FileIdentityProvider, SecretStorePersistence,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

/// Run bootstrap and supervise the process afterwards
///
/// On READY the process stays up serving probes and metrics until it
/// receives a termination signal. On a fatal outcome the error is logged at
/// the highest severity and returned, terminating the process deliberately.
pub async fn run(init: InitializationResult) -> Result<()> {
    let identity_provider = Arc::new(FileIdentityProvider::new(init.config.identity_path.clone()));
    let persistence = Arc::new(SecretStorePersistence::new(
        init.config.root_key_secret_name.clone(),
        init.config.namespace.clone(),
        init.cancel.clone(),
    ));

    let coordinator = BootstrapCoordinator::new(
        Arc::clone(&init.config),
        Arc::clone(&init.keys),
        identity_provider,
        persistence,
        init.cancel.clone(),
    )
    .with_retry_strategy(init.retry_config.strategy());

    let server_state = Arc::clone(&init.server_state);
    let outcome = coordinator
        .run(init.server_started, move || server_state.mark_ready())
        .await;

    match outcome {
        BootstrapOutcome::Ready => {
            info!("Bootstrap complete; serving until terminated");
            tokio::signal::ctrl_c().await?;
            info!("Termination signal received; shutting down");
            init.cancel.cancel();
            Ok(())
        }
        BootstrapOutcome::Fatal(reason) => {
            error!("Bootstrap failed: {}", reason);
            init.cancel.cancel();
            Err(anyhow::anyhow!("bootstrap failed: {reason}"))
        }
    }
}
