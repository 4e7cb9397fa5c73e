//! # Binding Secret
//!
//! Materialization of the collected data as a Secret owned by the binding.

use crate::crd::ServiceBinding;
use crate::resolver::{ClientError, KindDiscovery, ResourceClient};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::core::DynamicObject;
use kube::{Resource, ResourceExt};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Secret named after the binding, holding every collected entry
///
/// The binding becomes the controlling owner when it has a uid.
pub fn build_secret(binding: &ServiceBinding, namespace: &str, data: &BTreeMap<String, Vec<u8>>) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(binding.name_any()),
            namespace: Some(namespace.to_string()),
            owner_references: binding.controller_owner_ref(&()).map(|r| vec![r]),
            ..ObjectMeta::default()
        },
        data: Some(
            data.iter()
                .map(|(k, v)| (k.clone(), ByteString(v.clone())))
                .collect(),
        ),
        type_: Some("Opaque".to_string()),
        ..Secret::default()
    }
}

/// Secret data, with an absent map read as empty
///
/// The API server drops empty maps, so a stored Secret without entries has
/// no `data` at all.
fn secret_data(object: &DynamicObject) -> Option<&serde_json::Map<String, Value>> {
    match object.data.get("data") {
        Some(Value::Object(data)) if !data.is_empty() => Some(data),
        _ => None,
    }
}

/// Create the Secret, or update it when it already exists with different content
///
/// Returns whether a create or update was issued.
pub async fn write_secret(
    client: &dyn ResourceClient,
    discovery: &dyn KindDiscovery,
    secret: &Secret,
) -> Result<bool, ClientError> {
    let resource = discovery
        .discover_resource("", "v1", "secrets")
        .await?
        .ok_or_else(|| ClientError::InvalidObject("cluster does not serve v1 secrets".to_string()))?;
    let mut object: DynamicObject = serde_json::from_value(serde_json::to_value(secret)?)?;
    let name = object.name_any();
    let namespace = object.metadata.namespace.clone();

    match client.get(&resource, namespace.as_deref(), &name).await? {
        Some(existing) => {
            let unchanged = secret_data(&existing) == secret_data(&object)
                && existing.data.get("type") == object.data.get("type")
                && existing.metadata.owner_references == object.metadata.owner_references;
            if unchanged {
                debug!(secret = %name, "binding secret up to date");
                return Ok(false);
            }
            object.metadata.resource_version = existing.metadata.resource_version;
            client.update(&resource, &object).await?;
            info!(secret = %name, "updated binding secret");
            Ok(true)
        }
        None => {
            client.create(&resource, &object).await?;
            info!(secret = %name, "created binding secret");
            Ok(true)
        }
    }
}
