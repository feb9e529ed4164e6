//! # Metrics
//!
//! Prometheus metrics for the Safe runtime: bootstrap progress, envelope
//! encryption operations, retry attempts, and poll interval adjustments.

use anyhow::Result;
use prometheus::{Encoder, IntCounterVec, IntGauge, Registry, TextEncoder};
use std::sync::LazyLock;

/// Global Prometheus metrics registry
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static BOOTSTRAP_SIGNALS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "safe_bootstrap_signals_total",
            "Bootstrap completion signals received, by stage",
        ),
        &["stage"],
    )
    .expect("Failed to create BOOTSTRAP_SIGNALS_TOTAL metric - this should never happen")
});

static BOOTSTRAP_READY: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "safe_bootstrap_ready",
        "Whether bootstrap has completed (1) or not (0)",
    )
    .expect("Failed to create BOOTSTRAP_READY metric - this should never happen")
});

static ENCRYPTION_OPS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "safe_encryption_ops_total",
            "Envelope encryption operations, by algorithm, direction, and outcome",
        ),
        &["algorithm", "direction", "outcome"],
    )
    .expect("Failed to create ENCRYPTION_OPS_TOTAL metric - this should never happen")
});

static RETRY_ATTEMPTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "safe_retry_attempts_total",
            "Retry attempts, by scope",
        ),
        &["scope"],
    )
    .expect("Failed to create RETRY_ATTEMPTS_TOTAL metric - this should never happen")
});

static POLL_INTERVAL_ADJUSTMENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "safe_poll_interval_adjustments_total",
            "Adaptive poll interval adjustments, by direction",
        ),
        &["direction"],
    )
    .expect("Failed to create POLL_INTERVAL_ADJUSTMENTS_TOTAL metric - this should never happen")
});

/// Register all metrics with the Prometheus registry
///
/// Registry::register() takes ownership (Box<dyn Collector>), so we clone
/// the metrics. Prometheus metrics internally use Arc, so cloning is cheap.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(BOOTSTRAP_SIGNALS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BOOTSTRAP_READY.clone()))?;
    REGISTRY.register(Box::new(ENCRYPTION_OPS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RETRY_ATTEMPTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(POLL_INTERVAL_ADJUSTMENTS_TOTAL.clone()))?;
    Ok(())
}

/// Record one bootstrap completion signal
pub fn increment_bootstrap_signal(stage: &str) {
    BOOTSTRAP_SIGNALS_TOTAL.with_label_values(&[stage]).inc();
}

/// Flip the readiness gauge once bootstrap completes
pub fn mark_bootstrap_ready() {
    BOOTSTRAP_READY.set(1);
}

/// Record one envelope encryption operation
pub fn increment_encryption_op(algorithm: &str, direction: &str, outcome: &str) {
    ENCRYPTION_OPS_TOTAL
        .with_label_values(&[algorithm, direction, outcome])
        .inc();
}

/// Record one retry attempt for a scope
pub fn increment_retry_attempt(scope: &str) {
    RETRY_ATTEMPTS_TOTAL.with_label_values(&[scope]).inc();
}

/// Record one adaptive poll interval adjustment
pub fn increment_poll_adjustment(direction: &str) {
    POLL_INTERVAL_ADJUSTMENTS_TOTAL
        .with_label_values(&[direction])
        .inc();
}

/// Encode the current metrics in Prometheus text format
pub fn metrics_text() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
