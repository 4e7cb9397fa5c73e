//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Namespace to watch for ServiceBindings
    /// `None` watches all namespaces
    pub watch_namespace: Option<String>,
    /// Field manager used for status patches
    pub field_manager: String,
    /// Root directory for file bindings (`bindAsFiles`)
    pub binding_root: String,
    /// Metrics and probe server port
    pub metrics_port: u16,
    /// Requeue interval after a non-retryable failure (seconds)
    /// The binding is re-examined periodically, but only an edit can fix it
    pub reconciliation_error_requeue_secs: u64,
    /// Exponential backoff starting value (milliseconds)
    pub backoff_start_ms: u64,
    /// Exponential backoff maximum value (milliseconds)
    pub backoff_max_ms: u64,
    /// Periodic resync interval after a successful bind (seconds)
    pub success_requeue_secs: u64,
    /// Maximum concurrent reconciliations
    pub max_concurrent_reconciliations: usize,
    /// Global log filter used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            watch_namespace: None,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            binding_root: DEFAULT_BINDING_ROOT.to_string(),
            metrics_port: DEFAULT_METRICS_PORT,
            reconciliation_error_requeue_secs: DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            backoff_start_ms: DEFAULT_BACKOFF_START_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            success_requeue_secs: DEFAULT_SUCCESS_REQUEUE_SECS,
            max_concurrent_reconciliations: 10,
            log_level: "info".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            watch_namespace: std::env::var("WATCH_NAMESPACE")
                .ok()
                .filter(|ns| !ns.trim().is_empty()),
            field_manager: env_var_or_default_str("FIELD_MANAGER", DEFAULT_FIELD_MANAGER),
            binding_root: env_var_or_default_str("BINDING_ROOT", DEFAULT_BINDING_ROOT),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            reconciliation_error_requeue_secs: env_var_or_default(
                "RECONCILIATION_ERROR_REQUEUE_SECS",
                DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            ),
            backoff_start_ms: env_var_or_default("BACKOFF_START_MS", DEFAULT_BACKOFF_START_MS),
            backoff_max_ms: env_var_or_default("BACKOFF_MAX_MS", DEFAULT_BACKOFF_MAX_MS),
            success_requeue_secs: env_var_or_default(
                "SUCCESS_REQUEUE_SECS",
                DEFAULT_SUCCESS_REQUEUE_SECS,
            ),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                10,
            ),
            log_level: env_var_or_default_str("LOG_LEVEL", "info"),
        }
    }

    /// Get reconciliation error requeue duration
    pub fn reconciliation_error_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.reconciliation_error_requeue_secs)
    }

    /// Get periodic resync duration
    pub fn success_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.success_requeue_secs)
    }
}

fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
