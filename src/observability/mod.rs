//! # Observability
//!
//! - `metrics`: Prometheus metrics collection
//!
//! Logging goes through `tracing`; the subscriber is installed at startup.

pub mod metrics;

// Re-export for convenience
pub use metrics::*;
