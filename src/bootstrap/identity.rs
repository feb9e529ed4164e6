//! # Identity Acquisition
//!
//! The first bootstrap stage: obtain a workload identity from the identity
//! provider and validate it against the expected role pattern for this
//! component. The provider itself (SPIFFE workload API or otherwise) is an
//! external collaborator behind the [`IdentityProvider`] trait.

use crate::retry;
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// A validated workload identity
#[derive(Debug, Clone)]
pub struct IdentityHandle {
    /// The SPIFFE ID (or equivalent) naming this workload
    pub spiffe_id: String,
}

/// External collaborator that produces workload identities
///
/// Acquisition failures are treated as transient; callers wrap acquisition
/// in a retry.
#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    async fn acquire_identity(&self) -> Result<IdentityHandle>;
}

/// Identity provider reading a projected identity document from disk
///
/// Suits deployments where an agent (e.g. a SPIFFE CSI driver) projects the
/// workload identity into the pod filesystem. The file holds the identity
/// string; an absent or empty file means the agent has not attested the
/// workload yet, which is transient.
#[derive(Debug)]
pub struct FileIdentityProvider {
    path: PathBuf,
}

impl FileIdentityProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl IdentityProvider for FileIdentityProvider {
    async fn acquire_identity(&self) -> Result<IdentityHandle> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("identity document not readable at {}", self.path.display()))?;
        let spiffe_id = raw.trim().to_string();
        if spiffe_id.is_empty() {
            anyhow::bail!("identity document at {} is empty", self.path.display());
        }
        Ok(IdentityHandle { spiffe_id })
    }
}

/// Whether the acquired identity matches the expected role pattern
pub fn validate_role(handle: &IdentityHandle, expected_pattern: &str) -> bool {
    match Regex::new(expected_pattern) {
        Ok(pattern) => pattern.is_match(&handle.spiffe_id),
        Err(e) => {
            error!("Invalid identity role pattern '{}': {}", expected_pattern, e);
            false
        }
    }
}

/// The identity acquisition stage
///
/// Acquires an identity with backoff retries, validates the role, and
/// signals completion exactly once. On failure nothing is signalled; the
/// bootstrap timeout handles the stall.
pub(crate) async fn acquire_identity(
    correlation_id: String,
    provider: std::sync::Arc<dyn IdentityProvider>,
    role_pattern: String,
    strategy: retry::Strategy,
    acquired: mpsc::Sender<()>,
    cancel: CancellationToken,
) {
    info!("[{}] Acquiring identity...", correlation_id);

    let handle = match retry::retry(
        "identity-provider",
        || async { provider.acquire_identity().await },
        strategy,
        &cancel,
    )
    .await
    {
        Ok(handle) => handle,
        Err(e) => {
            error!(
                "[{}] Unable to acquire an identity from the provider: {}",
                correlation_id, e
            );
            return;
        }
    };

    if !validate_role(&handle, &role_pattern) {
        error!(
            "[{}] Identity check: I don't know you, and it's crazy: {}",
            correlation_id, handle.spiffe_id
        );
        return;
    }

    info!("[{}] Acquired identity: {}", correlation_id, handle.spiffe_id);
    let _ = acquired.send(()).await;
}
