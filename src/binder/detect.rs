//! # Binding Resource Detection
//!
//! Collects data from Secrets and ConfigMaps owned by a service, for services
//! that publish their connection details in child resources.

use crate::error::BindError;
use crate::resolver::{KindDiscovery, ResourceClient};
use crate::unstructured::{shape_name, FieldError};
use base64::Engine;
use kube::core::{DynamicObject, Selector};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

fn owned_by(object: &DynamicObject, uid: &str) -> bool {
    object
        .metadata
        .owner_references
        .as_ref()
        .is_some_and(|refs| refs.iter().any(|r| r.uid == uid))
}

fn undecodable(object: &DynamicObject, kind: &str, key: &str, found: &'static str) -> BindError {
    BindError::FieldTypeMismatch {
        service: format!(
            "{kind} {}/{}",
            object.metadata.namespace.as_deref().unwrap_or_default(),
            object.metadata.name.as_deref().unwrap_or_default()
        ),
        source: FieldError::WrongShape {
            path: format!("data.{key}"),
            expected: "base64-encoded UTF-8 text",
            found,
        },
    }
}

/// Text entries of a Secret (`decode`) or ConfigMap
///
/// Every entry must decode to UTF-8 text; a binding never carries a
/// partially decoded credential.
fn string_entries(object: &DynamicObject, kind: &str, decode: bool) -> Result<BTreeMap<String, String>, BindError> {
    let Some(Value::Object(data)) = object.data.get("data") else {
        return Ok(BTreeMap::new());
    };
    let mut entries = BTreeMap::new();
    for (key, value) in data {
        let raw = value
            .as_str()
            .ok_or_else(|| undecodable(object, kind, key, shape_name(value)))?;
        let text = if decode {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(raw)
                .map_err(|error| {
                    debug!(key = %key, %error, "secret entry is not base64");
                    undecodable(object, kind, key, "not valid base64")
                })?;
            String::from_utf8(bytes).map_err(|error| {
                debug!(key = %key, %error, "secret entry is not UTF-8");
                undecodable(object, kind, key, "not UTF-8 text")
            })?
        } else {
            raw.to_string()
        };
        entries.insert(key.clone(), text);
    }
    Ok(entries)
}

/// Data entries of every Secret and ConfigMap owned by `service`
///
/// Secret values are base64-decoded; ConfigMap values are taken verbatim.
/// ConfigMap entries are applied first, so Secrets win on key collisions.
/// A Secret entry that is not base64-encoded UTF-8 fails with
/// `FieldTypeMismatch`.
pub async fn owned_binding_data(
    client: &dyn ResourceClient,
    discovery: &dyn KindDiscovery,
    service: &DynamicObject,
    namespace: Option<&str>,
) -> Result<BTreeMap<String, String>, BindError> {
    let Some(uid) = service.metadata.uid.as_deref() else {
        debug!("service has no uid, skipping binding resource detection");
        return Ok(BTreeMap::new());
    };

    let mut data = BTreeMap::new();
    for (plural, kind, decode) in [("configmaps", "ConfigMap", false), ("secrets", "Secret", true)] {
        let Some(resource) = discovery.discover_resource("", "v1", plural).await? else {
            continue;
        };
        let objects = client.list(&resource, namespace, &Selector::default()).await?;
        for object in objects.iter().filter(|o| owned_by(o, uid)) {
            debug!(
                resource = plural,
                name = object.metadata.name.as_deref().unwrap_or_default(),
                "collecting owned binding resource"
            );
            data.extend(string_entries(object, kind, decode)?);
        }
    }
    Ok(data)
}
