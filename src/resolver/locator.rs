//! # Resource Locator
//!
//! Resolves a resource reference (GVK or GVR, namespace, name or selector)
//! to live objects through the `ResourceClient` and `KindDiscovery` seams.

use super::client::{ClientError, DiscoveredResource, KindDiscovery, ResourceClient};
use super::identity::ResourceIdentity;
use kube::core::{DynamicObject, GroupVersionKind, Selector};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Failure to locate a resource
#[derive(Debug, Error)]
pub enum LocateError {
    /// The cluster does not serve the requested kind or resource
    #[error("unknown kind {0}")]
    UnknownKind(String),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// What kind of resource a reference points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceType {
    /// Group/version/kind; the plural is discovered
    Kind(GroupVersionKind),
    /// Group/version/plural; the kind is discovered
    Resource {
        group: String,
        version: String,
        plural: String,
    },
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (group, version, name) = match self {
            Self::Kind(gvk) => (&gvk.group, &gvk.version, &gvk.kind),
            Self::Resource {
                group,
                version,
                plural,
            } => (group, version, plural),
        };
        if group.is_empty() {
            write!(f, "{version}/{name}")
        } else {
            write!(f, "{group}/{version}/{name}")
        }
    }
}

/// Which objects of the type are targeted
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Name(String),
    Selector(Selector),
}

/// A reference to one or more live resources
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRef {
    pub resource_type: ResourceType,
    /// Ignored for cluster-scoped kinds
    pub namespace: Option<String>,
    pub target: Target,
}

/// A live object together with the resource it was read through
#[derive(Debug, Clone)]
pub struct Resolved {
    pub resource: DiscoveredResource,
    pub object: DynamicObject,
}

impl Resolved {
    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity {
            group: self.resource.resource.group.clone(),
            version: self.resource.resource.version.clone(),
            kind: self.resource.resource.kind.clone(),
            namespace: self.object.metadata.namespace.clone(),
            name: self.object.metadata.name.clone().unwrap_or_default(),
        }
    }
}

/// Borrowing facade over the cluster collaborators
#[derive(Clone, Copy)]
pub struct ResourceLocator<'a> {
    client: &'a dyn ResourceClient,
    discovery: &'a dyn KindDiscovery,
}

impl fmt::Debug for ResourceLocator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLocator").finish_non_exhaustive()
    }
}

impl<'a> ResourceLocator<'a> {
    pub fn new(client: &'a dyn ResourceClient, discovery: &'a dyn KindDiscovery) -> Self {
        Self { client, discovery }
    }

    /// Map a resource type to the resource serving it
    pub async fn discover(&self, resource_type: &ResourceType) -> Result<DiscoveredResource, LocateError> {
        let found = match resource_type {
            ResourceType::Kind(gvk) => self.discovery.discover_kind(gvk).await?,
            ResourceType::Resource {
                group,
                version,
                plural,
            } => self.discovery.discover_resource(group, version, plural).await?,
        };
        found.ok_or_else(|| LocateError::UnknownKind(resource_type.to_string()))
    }

    /// Resolve a reference to a single object
    ///
    /// Selector references yield the first match by name.
    pub async fn resolve(&self, reference: &ResourceRef) -> Result<Option<Resolved>, LocateError> {
        Ok(self.resolve_all(reference).await?.into_iter().next())
    }

    /// Resolve a reference to every matching object, sorted by name
    pub async fn resolve_all(&self, reference: &ResourceRef) -> Result<Vec<Resolved>, LocateError> {
        let resource = self.discover(&reference.resource_type).await?;
        let namespace = resource.scoped_namespace(reference.namespace.as_deref());

        let mut objects = match &reference.target {
            Target::Name(name) => self
                .client
                .get(&resource, namespace, name)
                .await?
                .into_iter()
                .collect::<Vec<_>>(),
            Target::Selector(selector) => self.client.list(&resource, namespace, selector).await?,
        };
        objects.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));

        debug!(
            kind = %resource.resource.kind,
            namespace = namespace.unwrap_or_default(),
            found = objects.len(),
            "resolved reference"
        );

        Ok(objects
            .into_iter()
            .map(|object| Resolved {
                resource: resource.clone(),
                object,
            })
            .collect())
    }
}
