//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `service_binding_binds_total` - Total number of bind attempts
//! - `service_binding_bind_errors_total` - Failed binds and reconciliations by reason
//! - `service_binding_bind_duration_seconds` - Duration of bind operations
//! - `service_binding_secrets_written_total` - Binding Secrets materialized
//! - `service_binding_applications_injected_total` - Workloads wired to a binding Secret
//! - `service_binding_requeues_total` - Requeues by trigger

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static BINDS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "service_binding_binds_total",
        "Total number of bind attempts",
    )
    .expect("Failed to create BINDS_TOTAL metric - this should never happen")
});

static BIND_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "service_binding_bind_errors_total",
            "Total number of failed binds by condition reason",
        ),
        &["reason"],
    )
    .expect("Failed to create BIND_ERRORS_TOTAL metric - this should never happen")
});

static BIND_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "service_binding_bind_duration_seconds",
            "Duration of bind operations in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
    )
    .expect("Failed to create BIND_DURATION metric - this should never happen")
});

static SECRETS_WRITTEN_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "service_binding_secrets_written_total",
        "Total number of binding Secrets materialized",
    )
    .expect("Failed to create SECRETS_WRITTEN_TOTAL metric - this should never happen")
});

static APPLICATIONS_INJECTED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "service_binding_applications_injected_total",
        "Total number of workloads wired to a binding Secret",
    )
    .expect("Failed to create APPLICATIONS_INJECTED_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "service_binding_requeues_total",
            "Total number of requeues by trigger",
        ),
        &["trigger"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(BINDS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BIND_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BIND_DURATION.clone()))?;
    REGISTRY.register(Box::new(SECRETS_WRITTEN_TOTAL.clone()))?;
    REGISTRY.register(Box::new(APPLICATIONS_INJECTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_binds() {
    BINDS_TOTAL.inc();
}

pub fn increment_bind_errors(reason: &str) {
    BIND_ERRORS_TOTAL.with_label_values(&[reason]).inc();
}

pub fn observe_bind_duration(duration: f64) {
    BIND_DURATION.observe(duration);
}

pub fn increment_secrets_written() {
    SECRETS_WRITTEN_TOTAL.inc();
}

pub fn increment_applications_injected(count: usize) {
    APPLICATIONS_INJECTED_TOTAL.inc_by(count as u64);
}

pub fn increment_requeues_total(trigger: &str) {
    REQUEUES_TOTAL.with_label_values(&[trigger]).inc();
}
