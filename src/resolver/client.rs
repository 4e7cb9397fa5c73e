//! # Cluster Collaborators
//!
//! Trait seams for the generic resource client and kind discovery.
//!
//! The binder only ever talks to the cluster through these traits:
//! - `ResourceClient` reads and writes `DynamicObject`s of any kind
//! - `KindDiscovery` maps a group/version/kind (or resource) to its API resource

use async_trait::async_trait;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind, Selector};
use thiserror::Error;

/// Errors reported by cluster collaborators
///
/// All of these are considered transient by the binder: the surrounding
/// controller retries the whole binding.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: String, name: String },
    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },
    #[error("conflict updating {kind} '{name}': resourceVersion {resource_version} is stale")]
    Conflict {
        kind: String,
        name: String,
        resource_version: String,
    },
    #[error("invalid object: {0}")]
    InvalidObject(String),
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A kind known to the cluster, with the information needed to address it
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredResource {
    pub resource: ApiResource,
    pub namespaced: bool,
}

impl DiscoveredResource {
    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::gvk(
            &self.resource.group,
            &self.resource.version,
            &self.resource.kind,
        )
    }

    /// Namespace to use for this kind: cluster-scoped kinds drop it
    pub fn scoped_namespace<'a>(&self, namespace: Option<&'a str>) -> Option<&'a str> {
        if self.namespaced {
            namespace
        } else {
            None
        }
    }
}

/// Generic, schema-agnostic resource client
///
/// Updates must carry the `resourceVersion` read earlier so that concurrent
/// writers are detected (optimistic concurrency).
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Get one object by name; `Ok(None)` when it does not exist
    async fn get(
        &self,
        resource: &DiscoveredResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<DynamicObject>, ClientError>;

    /// List objects matching a label selector
    async fn list(
        &self,
        resource: &DiscoveredResource,
        namespace: Option<&str>,
        selector: &Selector,
    ) -> Result<Vec<DynamicObject>, ClientError>;

    /// Create an object in the namespace recorded in its metadata
    async fn create(
        &self,
        resource: &DiscoveredResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject, ClientError>;

    /// Replace an object; fails with a conflict when its resourceVersion is stale
    async fn update(
        &self,
        resource: &DiscoveredResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject, ClientError>;
}

/// Resource kind discovery
#[async_trait]
pub trait KindDiscovery: Send + Sync {
    /// Resolve a group/version/kind; `Ok(None)` when the cluster does not serve it
    async fn discover_kind(
        &self,
        gvk: &GroupVersionKind,
    ) -> Result<Option<DiscoveredResource>, ClientError>;

    /// Resolve a group/version/plural resource name
    async fn discover_resource(
        &self,
        group: &str,
        version: &str,
        plural: &str,
    ) -> Result<Option<DiscoveredResource>, ClientError>;
}
