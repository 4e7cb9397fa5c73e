//! # Types
//!
//! Core types for the reconciler.

use crate::config::ControllerConfig;
use crate::controller::backoff::ExponentialBackoff;
use crate::error::BindError;
use crate::resolver::{KindDiscovery, KubeDiscovery, KubeResourceClient, ResourceClient};
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Bind failed: {0}")]
    Bind(#[from] BindError),
    #[error("Status update failed: {0}")]
    StatusUpdate(#[source] kube::Error),
}

impl ReconcilerError {
    /// Metric label for this error
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcilerError::Bind(e) => e.reason(),
            ReconcilerError::StatusUpdate(_) => "StatusUpdateFailed",
        }
    }
}

/// Backoff state for a specific binding
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: ExponentialBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(start_ms: u64, max_ms: u64) -> Self {
        Self {
            backoff: ExponentialBackoff::new(start_ms, max_ms),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Shared reconciliation context
#[derive(Clone)]
pub struct Reconciler {
    pub client: Client,
    pub resources: Arc<dyn ResourceClient>,
    pub discovery: Arc<dyn KindDiscovery>,
    pub config: ControllerConfig,
    // Backoff state per binding (identified by namespace/name)
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(client: Client, config: ControllerConfig) -> Self {
        Self {
            resources: Arc::new(KubeResourceClient::new(client.clone())),
            discovery: Arc::new(KubeDiscovery::new(client.clone())),
            client,
            config,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a failure for `key` and return how long to wait before retrying
    ///
    /// Returns the delay and the consecutive error count.
    pub fn next_backoff(&self, key: &str) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states.entry(key.to_string()).or_insert_with(|| {
                    BackoffState::new(self.config.backoff_start_ms, self.config.backoff_max_ms)
                });
                state.increment_error();
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (Duration::from_millis(self.config.backoff_max_ms), 0)
            }
        }
    }

    /// Forget the failure history of `key` after a successful bind
    pub fn reset_backoff(&self, key: &str) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                states.remove(key);
            }
            Err(e) => warn!("Failed to lock backoff_states: {}", e),
        }
    }
}
