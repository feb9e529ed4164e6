//! # Secrets Safe
//!
//! A Kubernetes-native secrets store: encrypts secrets at rest with
//! envelope encryption and refuses to serve until its cryptographic key
//! material safely exists.
//!
//! ## Overview
//!
//! 1. **Bootstrap coordination** - Three stages run in parallel against a
//!    timeout: workload identity acquisition, root key materialization, and
//!    probe server startup. Readiness flips only after all three complete.
//! 2. **Root key lifecycle** - An X25519 keypair plus a 256-bit AES seed,
//!    held behind a reader/writer lock, loaded from a mounted Kubernetes
//!    Secret or freshly generated and persisted back on first boot.
//! 3. **Envelope encryption** - AES-256-CFB in FIPS-compliant mode, X25519
//!    sealed envelopes otherwise; the IV generation rate is throttled as a
//!    defense against degraded randomness.
//! 4. **Resilience primitives** - Retry-with-backoff for transient remote
//!    failures and an adaptive poller that tunes standing poll intervals.
//!
//! ## Features
//!
//! - **Fail-fast bootstrap**: no partial-readiness state; a timed-out or
//!   fatally-failed bootstrap terminates the process for the orchestrator
//!   to restart
//! - **Prometheus metrics**: bootstrap progress, encryption operations,
//!   retry attempts
//! - **Health probes**: HTTP endpoints for liveness and readiness checks

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod observability;
pub mod poller;
pub mod retry;
pub mod runtime;
pub mod server;
