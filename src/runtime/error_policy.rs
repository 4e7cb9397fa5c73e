//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.

use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::ServiceBinding;
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info};

/// Handle reconciliation errors with exponential backoff
///
/// Backoff state is tracked per binding to avoid cross-resource interference.
pub fn handle_reconciliation_error(
    binding: Arc<ServiceBinding>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = binding.name_any();
    let namespace = binding.namespace().unwrap_or_else(|| "default".to_string());

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}/{}: {}", namespace, name, error);
    observability::metrics::increment_bind_errors(error.reason());

    let resource_key = format!("{}/{}", namespace, name);
    let (delay, error_count) = ctx.next_backoff(&resource_key);

    info!(
        "Retrying in {}ms (error count: {}, trigger source: error-backoff)",
        delay.as_millis(),
        error_count
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(delay)
}
