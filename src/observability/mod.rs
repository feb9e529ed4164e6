//! # Observability Module
//!
//! Prometheus metrics for monitoring the Safe runtime.

pub mod metrics;
