//! # Bindable Fields
//!
//! Which fields of a service are eligible for automatic variable derivation.

use crate::constants::{BINDABLE_ANNOTATION_PREFIX, BINDABLE_ATTRIBUTE, BINDABLE_OBJECT};
use crate::resolver::ClientError;
use crate::unstructured::split_path;
use async_trait::async_trait;
use kube::core::DynamicObject;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindableKind {
    /// A single string field
    Attribute,
    /// A mapping whose string values each become a variable
    Object,
}

/// A field declared bindable on a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindableField {
    /// Path into the service's field tree
    pub path: Vec<String>,
    /// Variable name suffix before prefixing and sanitization
    pub name: String,
    pub kind: BindableKind,
}

impl BindableField {
    pub fn attribute<S: Into<String>>(path: impl IntoIterator<Item = S>, name: &str) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            name: name.to_string(),
            kind: BindableKind::Attribute,
        }
    }
}

/// Source of bindable field declarations for a service
#[async_trait]
pub trait BindableFields: Send + Sync {
    async fn bindable_fields(&self, service: &DynamicObject) -> Result<Vec<BindableField>, ClientError>;
}

/// Bindable fields declared through annotations on the service itself
///
/// `servicebinding.operators.coreos.com/status.dbName: binding:env:attribute`
/// declares one field. Services without any such annotation expose every
/// string-valued entry of `.status`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorBindableFields;

impl DescriptorBindableFields {
    fn annotated(service: &DynamicObject) -> Vec<BindableField> {
        let Some(annotations) = service.metadata.annotations.as_ref() else {
            return Vec::new();
        };
        annotations
            .iter()
            .filter_map(|(key, value)| {
                let field_path = key.strip_prefix(BINDABLE_ANNOTATION_PREFIX)?;
                let kind = match value.as_str() {
                    BINDABLE_ATTRIBUTE => BindableKind::Attribute,
                    BINDABLE_OBJECT => BindableKind::Object,
                    other => {
                        debug!(annotation = %key, value = %other, "ignoring unsupported binding annotation");
                        return None;
                    }
                };
                let path = split_path(field_path);
                let name = match path.split_first() {
                    Some((first, rest)) if (first == "status" || first == "spec") && !rest.is_empty() => {
                        rest.join(".")
                    }
                    _ => path.join("."),
                };
                (!path.is_empty()).then_some(BindableField { path, name, kind })
            })
            .collect()
    }

    fn status_convention(service: &DynamicObject) -> Vec<BindableField> {
        service
            .data
            .get("status")
            .and_then(|status| status.as_object())
            .map(|status| {
                status
                    .iter()
                    .filter(|(_, value)| value.is_string())
                    .map(|(key, _)| BindableField::attribute(["status", key.as_str()], key))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl BindableFields for DescriptorBindableFields {
    async fn bindable_fields(&self, service: &DynamicObject) -> Result<Vec<BindableField>, ClientError> {
        let annotated = Self::annotated(service);
        if annotated.is_empty() {
            Ok(Self::status_convention(service))
        } else {
            Ok(annotated)
        }
    }
}
