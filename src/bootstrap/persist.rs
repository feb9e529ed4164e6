//! # Root Key Materialization
//!
//! The second bootstrap stage: bring the root key material into existence.
//! Either the operator supplies it manually, or the stage reads the mounted
//! key Secret — generating, persisting, and storing a fresh collection if
//! the mount still holds the blank placeholder.
//!
//! A missing mount is a deployment error, not a transient one: it fails the
//! bootstrap immediately instead of being retried.

use crate::bootstrap::FatalReason;
use crate::config::SharedSafeConfig;
use crate::constants::{BLANK_ROOT_KEY, ROOT_KEY_FIELD};
use crate::crypto::KeyStore;
use crate::retry;
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// External collaborator persisting the serialized root key triplet
///
/// Persistence restores the Safe back to operation if it crashes or gets
/// evicted by the scheduler. Changing the root key without backing up the
/// existing one makes secrets encrypted under the old key undecryptable.
#[async_trait]
pub trait KeyPersistence: Send + Sync + std::fmt::Debug {
    async fn persist(&self, serialized: &str) -> Result<()>;
}

/// Persists the root key into a Kubernetes Secret field
///
/// The Secret is expected to exist (created at deploy time with the blank
/// placeholder); only the key field is patched. Each attempt builds its own
/// client so a not-yet-ready API server is retried from scratch.
#[derive(Debug)]
pub struct SecretStorePersistence {
    secret_name: String,
    namespace: String,
    cancel: CancellationToken,
}

impl SecretStorePersistence {
    pub fn new(secret_name: String, namespace: String, cancel: CancellationToken) -> Self {
        Self {
            secret_name,
            namespace,
            cancel,
        }
    }
}

#[async_trait]
impl KeyPersistence for SecretStorePersistence {
    async fn persist(&self, serialized: &str) -> Result<()> {
        retry::retry_fixed(
            "root-key-secret",
            || async {
                let client = Client::try_default()
                    .await
                    .context("error creating Kubernetes client")?;
                let secrets: Api<Secret> = Api::namespaced(client, &self.namespace);

                let patch = serde_json::json!({
                    "apiVersion": "v1",
                    "kind": "Secret",
                    "stringData": { ROOT_KEY_FIELD: serialized },
                });
                secrets
                    .patch(
                        &self.secret_name,
                        &PatchParams::default(),
                        &Patch::Merge(&patch),
                    )
                    .await
                    .with_context(|| {
                        format!(
                            "error updating secret {}/{}",
                            self.namespace, self.secret_name
                        )
                    })?;
                Ok(())
            },
            &self.cancel,
        )
        .await
    }
}

/// The root key materialization stage
///
/// Signals completion exactly once on success; unrecoverable conditions are
/// reported on the fatal channel and nothing is signalled.
pub(crate) async fn materialize_root_key(
    correlation_id: String,
    config: SharedSafeConfig,
    keys: Arc<KeyStore>,
    persistence: Arc<dyn KeyPersistence>,
    materialized: mpsc::Sender<()>,
    fatal: mpsc::Sender<FatalReason>,
) {
    if config.manual_key_input {
        info!(
            "[{}] Manual key input enabled. Skipping automatic key generation.",
            correlation_id
        );
        let _ = materialized.send(()).await;
        return;
    }

    // The root key is a Kubernetes Secret, mounted as a file.
    let key_path = &config.root_key_path;
    if !Path::new(key_path).exists() {
        let _ = fatal
            .send(FatalReason::MissingKeyMount {
                path: key_path.clone(),
            })
            .await;
        return;
    }

    let data = match tokio::fs::read_to_string(key_path).await {
        Ok(data) => data,
        Err(e) => {
            let _ = fatal
                .send(FatalReason::KeyMountUnreadable {
                    path: key_path.clone(),
                    message: e.to_string(),
                })
                .await;
            return;
        }
    };

    if data != BLANK_ROOT_KEY {
        info!(
            "[{}] Root key has been set in the cluster, will reuse it",
            correlation_id
        );
        if let Err(e) = keys.set(&data) {
            let _ = fatal
                .send(FatalReason::MalformedKey {
                    message: e.to_string(),
                })
                .await;
            return;
        }
        let _ = materialized.send(()).await;
        return;
    }

    info!(
        "[{}] Root key has not been set yet. Will compute a secure secret.",
        correlation_id
    );

    let collection = match keys.generate() {
        Ok(collection) => collection,
        Err(e) => {
            let _ = fatal
                .send(FatalReason::KeyGenerationFailed {
                    message: e.to_string(),
                })
                .await;
            return;
        }
    };
    info!(
        "[{}] Generated public key, private key, and AES seed",
        correlation_id
    );

    let combined = collection.combine();

    // Persist to the backing store before activating the key in memory.
    if let Err(e) = persistence.persist(&combined).await {
        let _ = fatal
            .send(FatalReason::PersistFailed {
                message: e.to_string(),
            })
            .await;
        return;
    }

    if let Err(e) = keys.set(&combined) {
        let _ = fatal
            .send(FatalReason::MalformedKey {
                message: e.to_string(),
            })
            .await;
        return;
    }

    let _ = materialized.send(()).await;
}
