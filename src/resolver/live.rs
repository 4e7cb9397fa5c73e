//! # Kubernetes Collaborators
//!
//! `ResourceClient` and `KindDiscovery` backed by a live API server.

use super::client::{ClientError, DiscoveredResource, KindDiscovery, ResourceClient};
use async_trait::async_trait;
use kube::api::{Api, ListParams, PostParams};
use kube::core::{DynamicObject, GroupVersion, GroupVersionKind, Selector};
use kube::discovery::{self, ApiCapabilities, Scope};
use kube::Client;
use tracing::debug;

/// Dynamic client over `Api<DynamicObject>`
#[derive(Clone)]
pub struct KubeResourceClient {
    client: Client,
}

impl std::fmt::Debug for KubeResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeResourceClient").finish_non_exhaustive()
    }
}

impl KubeResourceClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, resource: &DiscoveredResource, namespace: Option<&str>) -> Api<DynamicObject> {
        match resource.scoped_namespace(namespace) {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &resource.resource),
            None if resource.namespaced => {
                Api::default_namespaced_with(self.client.clone(), &resource.resource)
            }
            None => Api::all_with(self.client.clone(), &resource.resource),
        }
    }
}

fn object_name(object: &DynamicObject) -> Result<&str, ClientError> {
    object
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| ClientError::InvalidObject("object has no metadata.name".to_string()))
}

#[async_trait]
impl ResourceClient for KubeResourceClient {
    async fn get(
        &self,
        resource: &DiscoveredResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<DynamicObject>, ClientError> {
        Ok(self.api(resource, namespace).get_opt(name).await?)
    }

    async fn list(
        &self,
        resource: &DiscoveredResource,
        namespace: Option<&str>,
        selector: &Selector,
    ) -> Result<Vec<DynamicObject>, ClientError> {
        let api = match resource.scoped_namespace(namespace) {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &resource.resource),
            None => Api::all_with(self.client.clone(), &resource.resource),
        };
        debug!(kind = %resource.resource.kind, selector = %selector, "listing objects");
        let list = api.list(&ListParams::default().labels_from(selector)).await?;
        Ok(list.items)
    }

    async fn create(
        &self,
        resource: &DiscoveredResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject, ClientError> {
        let api = self.api(resource, object.metadata.namespace.as_deref());
        Ok(api.create(&PostParams::default(), object).await?)
    }

    async fn update(
        &self,
        resource: &DiscoveredResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject, ClientError> {
        let name = object_name(object)?;
        let api = self.api(resource, object.metadata.namespace.as_deref());
        match api.replace(name, &PostParams::default(), object).await {
            Ok(updated) => Ok(updated),
            Err(kube::Error::Api(api_err)) if api_err.code == 409 => Err(ClientError::Conflict {
                kind: resource.resource.kind.clone(),
                name: name.to_string(),
                resource_version: object.metadata.resource_version.clone().unwrap_or_default(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Discovery through the API server's aggregated discovery endpoints
#[derive(Clone)]
pub struct KubeDiscovery {
    client: Client,
}

impl std::fmt::Debug for KubeDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeDiscovery").finish_non_exhaustive()
    }
}

impl KubeDiscovery {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn discovered(resource: kube::core::ApiResource, caps: &ApiCapabilities) -> DiscoveredResource {
    DiscoveredResource {
        resource,
        namespaced: matches!(caps.scope, Scope::Namespaced),
    }
}

#[async_trait]
impl KindDiscovery for KubeDiscovery {
    async fn discover_kind(
        &self,
        gvk: &GroupVersionKind,
    ) -> Result<Option<DiscoveredResource>, ClientError> {
        match discovery::pinned_kind(&self.client, gvk).await {
            Ok((ar, caps)) => Ok(Some(discovered(ar, &caps))),
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => Ok(None),
            Err(kube::Error::Discovery(e)) => {
                debug!(error = %e, "kind not served");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn discover_resource(
        &self,
        group: &str,
        version: &str,
        plural: &str,
    ) -> Result<Option<DiscoveredResource>, ClientError> {
        let gv = GroupVersion::gv(group, version);
        match discovery::pinned_group(&self.client, &gv).await {
            Ok(api_group) => Ok(api_group
                .versioned_resources(version)
                .into_iter()
                .find(|(ar, _)| ar.plural == plural)
                .map(|(ar, caps)| discovered(ar, &caps))),
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => Ok(None),
            Err(kube::Error::Discovery(e)) => {
                debug!(error = %e, "group not served");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
