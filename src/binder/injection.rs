//! # Application Injection
//!
//! Mutates an application's field tree so that it consumes the binding
//! Secret. Every mutation is idempotent: injecting twice yields the same tree.

use super::application::InjectionPath;
use crate::constants::SERVICE_BINDING_ROOT_ENV;
use crate::resolver::{ClientError, ResourceClient, Resolved};
use crate::unstructured::{format_path, nested_field_mut, sequence_mut, set_nested_field, shape_name, FieldError};
use kube::core::DynamicObject;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum InjectionError {
    /// The application does not have the expected shape
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl InjectionError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Client(_))
    }
}

/// How the Secret is consumed by containers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionMode {
    /// `envFrom.secretRef`
    EnvFrom,
    /// Secret volume mounted at `mount_path`, plus `SERVICE_BINDING_ROOT`
    Files {
        mount_path: String,
        binding_root: String,
    },
}

/// Replace the entry whose `key` equals `name`, or append `entry`
fn upsert_named(items: &mut Vec<Value>, key: &str, name: &str, entry: Value) {
    match items.iter_mut().find(|item| item.get(key).and_then(Value::as_str) == Some(name)) {
        Some(existing) => *existing = entry,
        None => items.push(entry),
    }
}

fn inject_container(container: &mut Value, secret_name: &str, mode: &InjectionMode) -> Result<(), FieldError> {
    match mode {
        InjectionMode::EnvFrom => {
            let env_from = sequence_mut(container, &["envFrom"])?;
            let present = env_from
                .iter()
                .any(|e| e.pointer("/secretRef/name").and_then(Value::as_str) == Some(secret_name));
            if !present {
                env_from.push(json!({"secretRef": {"name": secret_name}}));
            }
        }
        InjectionMode::Files {
            mount_path,
            binding_root,
        } => {
            upsert_named(
                sequence_mut(container, &["volumeMounts"])?,
                "name",
                secret_name,
                json!({"name": secret_name, "mountPath": mount_path}),
            );
            upsert_named(
                sequence_mut(container, &["env"])?,
                "name",
                SERVICE_BINDING_ROOT_ENV,
                json!({"name": SERVICE_BINDING_ROOT_ENV, "value": binding_root}),
            );
        }
    }
    Ok(())
}

/// Wire the Secret into an application field tree
pub fn inject(
    object: &mut Value,
    secret_name: &str,
    path: &InjectionPath,
    mode: &InjectionMode,
) -> Result<(), FieldError> {
    match path {
        InjectionPath::SecretField(field) => {
            let found = shape_name(object);
            let map = object.as_object_mut().ok_or_else(|| FieldError::WrongShape {
                path: String::new(),
                expected: "a mapping",
                found,
            })?;
            set_nested_field(map, Value::String(secret_name.to_string()), field)
        }
        InjectionPath::Containers(containers_path) => {
            let containers = nested_field_mut(object, containers_path)?;
            let found = shape_name(containers);
            let containers = containers.as_array_mut().ok_or_else(|| FieldError::WrongShape {
                path: format_path(containers_path),
                expected: "a sequence",
                found,
            })?;
            for container in containers.iter_mut() {
                inject_container(container, secret_name, mode)?;
            }

            if matches!(mode, InjectionMode::Files { .. }) {
                let mut volumes_path = containers_path.clone();
                volumes_path.pop();
                volumes_path.push("volumes".to_string());
                upsert_named(
                    sequence_mut(object, &volumes_path)?,
                    "name",
                    secret_name,
                    json!({"name": secret_name, "secret": {"secretName": secret_name}}),
                );
            }
            Ok(())
        }
    }
}

/// Inject into a live application, updating it only when the tree changed
///
/// Returns whether an update was issued.
pub async fn inject_application(
    client: &dyn ResourceClient,
    application: &Resolved,
    secret_name: &str,
    path: &InjectionPath,
    mode: &InjectionMode,
) -> Result<bool, InjectionError> {
    let identity = application.identity();
    let mut tree = serde_json::to_value(&application.object).map_err(ClientError::from)?;
    let before = tree.clone();
    inject(&mut tree, secret_name, path, mode)?;

    if tree == before {
        debug!(application = %identity, "application already consumes the binding secret");
        return Ok(false);
    }

    let updated: DynamicObject = serde_json::from_value(tree).map_err(ClientError::from)?;
    client.update(&application.resource, &updated).await?;
    info!(application = %identity, secret = %secret_name, "injected binding secret");
    Ok(true)
}
