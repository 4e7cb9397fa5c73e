//! # Service Marking
//!
//! Records on every bound service which bindings consume it.

use crate::constants::BOUND_BY_ANNOTATION;
use crate::resolver::{ClientError, Resolved, ResourceClient};
use kube::core::DynamicObject;
use std::collections::BTreeSet;
use tracing::debug;

/// Binding keys listed on `object`
pub fn bound_by(object: &DynamicObject) -> BTreeSet<String> {
    object
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(BOUND_BY_ANNOTATION))
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Copy of `object` listing `binding_key`, or `None` when it already does
pub fn with_binding(object: &DynamicObject, binding_key: &str) -> Option<DynamicObject> {
    let mut keys = bound_by(object);
    if !keys.insert(binding_key.to_string()) {
        return None;
    }
    let mut marked = object.clone();
    marked
        .metadata
        .annotations
        .get_or_insert_with(Default::default)
        .insert(
            BOUND_BY_ANNOTATION.to_string(),
            keys.into_iter().collect::<Vec<_>>().join(","),
        );
    Some(marked)
}

/// Mark the service with the binding
///
/// The update carries the resourceVersion read during resolution. Returns
/// whether a write was issued.
pub async fn mark_service(
    client: &dyn ResourceClient,
    service: &Resolved,
    binding_key: &str,
) -> Result<bool, ClientError> {
    let Some(marked) = with_binding(&service.object, binding_key) else {
        debug!(service = %service.identity(), "service already marked");
        return Ok(false);
    };
    client.update(&service.resource, &marked).await?;
    debug!(service = %service.identity(), binding = binding_key, "marked service");
    Ok(true)
}
