//! # Service Contexts
//!
//! One `ServiceContext` per declared service: the resolved object's field
//! tree, its identity, and the variables derived from it.

use super::bindable::BindableFields;
use super::{detect, envvars};
use crate::crd::Service;
use crate::error::BindError;
use crate::resolver::{
    KindDiscovery, Resolved, ResourceClient, ResourceIdentity, ResourceLocator, ResourceRef,
    ResourceType, Target,
};
use kube::core::GroupVersionKind;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// A resolved service, ready to contribute to the lookup context and the Secret
#[derive(Debug, Clone)]
pub struct ServiceContext {
    pub identity: ResourceIdentity,
    /// Full field tree of the resolved object
    pub service: Value,
    pub id: Option<String>,
    /// `Some("")` disables the per-service prefix, `None` falls back to the kind
    pub name_prefix: Option<String>,
    /// Unprefixed variable name -> value
    pub env_vars: BTreeMap<String, String>,
}

impl ServiceContext {
    /// Variables keyed by their final, prefixed and sanitized names
    pub fn prefixed_env_vars(&self, global_prefix: Option<&str>) -> BTreeMap<String, String> {
        let prefixes = envvars::prefixes(global_prefix, self.name_prefix.as_deref(), &self.identity.kind);
        self.env_vars
            .iter()
            .map(|(name, value)| {
                let mut segments = prefixes.clone();
                segments.push(name.clone());
                (envvars::build_key(&segments), value.clone())
            })
            .collect()
    }
}

/// Resource reference for a declared service
///
/// A service needs a name or a parseable label selector.
pub fn service_ref(service: &Service, default_namespace: &str) -> Result<ResourceRef, BindError> {
    let target = match (&service.name, &service.label_selector) {
        (Some(name), _) => Target::Name(name.clone()),
        (None, Some(selector)) => Target::Selector(selector.to_selector().map_err(|e| {
            BindError::InvalidOptions(format!("labelSelector of service {}: {e}", service.kind))
        })?),
        (None, None) => {
            return Err(BindError::InvalidOptions(format!(
                "service {} needs a name or a labelSelector",
                service.kind
            )))
        }
    };
    Ok(ResourceRef {
        resource_type: ResourceType::Kind(GroupVersionKind::gvk(
            &service.group,
            &service.version,
            &service.kind,
        )),
        namespace: Some(
            service
                .namespace
                .clone()
                .unwrap_or_else(|| default_namespace.to_string()),
        ),
        target,
    })
}

fn describe(reference: &ResourceRef) -> String {
    let target = match &reference.target {
        Target::Name(name) => name.clone(),
        Target::Selector(selector) => format!("[{selector}]"),
    };
    format!(
        "{} {}/{target}",
        reference.resource_type,
        reference.namespace.as_deref().unwrap_or_default(),
    )
}

/// Builds service contexts in declaration order
pub struct ServiceContextBuilder<'a> {
    pub client: &'a dyn ResourceClient,
    pub discovery: &'a dyn KindDiscovery,
    pub bindable: &'a dyn BindableFields,
    pub namespace: &'a str,
    pub detect_binding_resources: bool,
}

impl std::fmt::Debug for ServiceContextBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContextBuilder")
            .field("namespace", &self.namespace)
            .field("detect_binding_resources", &self.detect_binding_resources)
            .finish_non_exhaustive()
    }
}

impl ServiceContextBuilder<'_> {
    /// Resolve and build every service, keeping the live object next to its context
    pub async fn build(&self, services: &[Service]) -> Result<Vec<(Resolved, ServiceContext)>, BindError> {
        let mut contexts = Vec::with_capacity(services.len());
        for service in services {
            contexts.push(self.build_one(service).await?);
        }
        Ok(contexts)
    }

    async fn build_one(&self, service: &Service) -> Result<(Resolved, ServiceContext), BindError> {
        let locator = ResourceLocator::new(self.client, self.discovery);
        let reference = service_ref(service, self.namespace)?;
        let resolved = locator
            .resolve(&reference)
            .await?
            .ok_or_else(|| BindError::ServiceNotFound(describe(&reference)))?;
        let identity = resolved.identity();

        let tree = serde_json::to_value(&resolved.object)?;
        let fields = self.bindable.bindable_fields(&resolved.object).await?;
        let mut env_vars =
            envvars::derive_env_vars(&tree, &fields).map_err(|source| BindError::FieldTypeMismatch {
                service: identity.to_string(),
                source,
            })?;

        if self.detect_binding_resources {
            let owned = detect::owned_binding_data(
                self.client,
                self.discovery,
                &resolved.object,
                resolved.resource.scoped_namespace(reference.namespace.as_deref()),
            )
            .await?;
            env_vars.extend(owned);
        }

        debug!(service = %identity, vars = env_vars.len(), "built service context");

        let context = ServiceContext {
            identity,
            service: tree,
            id: service.id.clone(),
            name_prefix: service.env_var_prefix.clone(),
            env_vars,
        };
        Ok((resolved, context))
    }
}
