//! # Status
//!
//! Projects a [`BindingResult`] onto the `ServiceBinding` status subresource.

use crate::binder::BindingResult;
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::crd::{ServiceBinding, ServiceBindingStatus};
use chrono::{DateTime, Utc};
use kube::api::{Api, Patch, PatchParams};
use kube::ResourceExt;
use tracing::debug;

/// Build the status for `binding` after a bind
///
/// Transition times of unchanged conditions are preserved. The Secret name
/// of an earlier bind is kept when this one failed before writing it.
pub fn build_status(
    binding: &ServiceBinding,
    result: &BindingResult,
    now: DateTime<Utc>,
) -> ServiceBindingStatus {
    let previous = binding.status.as_ref();
    let previous_conditions = previous.map(|s| s.conditions.as_slice()).unwrap_or_default();

    ServiceBindingStatus {
        conditions: result.conditions.to_status_conditions(previous_conditions, now),
        secret: result
            .secret
            .clone()
            .or_else(|| previous.and_then(|s| s.secret.clone())),
        observed_generation: binding.metadata.generation,
    }
}

/// Patch the status subresource, skipping the write when nothing changed
///
/// Returns whether a patch was sent.
pub async fn update_status(
    reconciler: &Reconciler,
    binding: &ServiceBinding,
    status: &ServiceBindingStatus,
) -> Result<bool, ReconcilerError> {
    if binding.status.as_ref() == Some(status) {
        debug!("Status unchanged, skipping patch");
        return Ok(false);
    }

    let name = binding.name_any();
    let namespace = binding.namespace().unwrap_or_else(|| "default".to_string());
    let api: Api<ServiceBinding> = Api::namespaced(reconciler.client.clone(), &namespace);

    let patch = serde_json::json!({ "status": status });
    api.patch_status(
        &name,
        &PatchParams::apply(&reconciler.config.field_manager),
        &Patch::Merge(patch),
    )
    .await
    .map_err(ReconcilerError::StatusUpdate)?;

    debug!("Updated status for {}/{}", namespace, name);
    Ok(true)
}
