//! # In-Memory Cluster
//!
//! A self-contained `ResourceClient` + `KindDiscovery` used by tests and dry runs.
//!
//! Objects are stored per group/plural/namespace/name. Every write bumps a
//! cluster-wide revision used as `resourceVersion`, and updates carrying a stale
//! `resourceVersion` are rejected, the same way the API server does it.
//! All calls are recorded so callers can assert on the issued actions.

use super::client::{ClientError, DiscoveredResource, KindDiscovery, ResourceClient};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind, Selector, SelectorExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Verb of a recorded client call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    List,
    Create,
    Update,
}

/// A client call issued against the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAction {
    pub verb: Verb,
    /// Plural resource name, e.g. `secrets`
    pub resource: String,
    pub namespace: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ObjectKey {
    group: String,
    plural: String,
    namespace: String,
    name: String,
}

#[derive(Debug, Default)]
struct ClusterState {
    kinds: Vec<DiscoveredResource>,
    objects: BTreeMap<ObjectKey, DynamicObject>,
    revision: u64,
    actions: Vec<RecordedAction>,
    failing_writes: BTreeSet<String>,
}

impl ClusterState {
    fn next_revision(&mut self) -> String {
        self.revision += 1;
        self.revision.to_string()
    }

    fn kind_of(&self, object: &DynamicObject) -> Result<DiscoveredResource, ClientError> {
        let types = object
            .types
            .as_ref()
            .ok_or_else(|| ClientError::InvalidObject("object has no apiVersion/kind".to_string()))?;
        let (group, version) = types
            .api_version
            .split_once('/')
            .unwrap_or(("", types.api_version.as_str()));
        self.kinds
            .iter()
            .find(|k| {
                k.resource.group == group
                    && k.resource.version == version
                    && k.resource.kind == types.kind
            })
            .cloned()
            .ok_or_else(|| {
                ClientError::InvalidObject(format!(
                    "kind {} {} is not registered",
                    types.api_version, types.kind
                ))
            })
    }

    fn record(&mut self, verb: Verb, resource: &DiscoveredResource, namespace: Option<&str>, name: Option<&str>) {
        self.actions.push(RecordedAction {
            verb,
            resource: resource.resource.plural.clone(),
            namespace: namespace.map(str::to_string),
            name: name.map(str::to_string),
        });
    }
}

fn key(resource: &DiscoveredResource, namespace: Option<&str>, name: &str) -> ObjectKey {
    ObjectKey {
        group: resource.resource.group.clone(),
        plural: resource.resource.plural.clone(),
        namespace: resource
            .scoped_namespace(namespace)
            .unwrap_or_default()
            .to_string(),
        name: name.to_string(),
    }
}

fn object_name(object: &DynamicObject) -> Result<&str, ClientError> {
    object
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| ClientError::InvalidObject("object has no metadata.name".to_string()))
}

/// In-memory cluster with discovery, optimistic concurrency and an action log
#[derive(Debug, Default)]
pub struct MemoryCluster {
    state: Mutex<ClusterState>,
}

impl MemoryCluster {
    /// Cluster serving Secrets, ConfigMaps and Deployments
    pub fn new() -> Self {
        let cluster = Self::default();
        cluster.register_kind("", "v1", "Secret", "secrets", true);
        cluster.register_kind("", "v1", "ConfigMap", "configmaps", true);
        cluster.register_kind("apps", "v1", "Deployment", "deployments", true);
        cluster
    }

    fn state(&self) -> MutexGuard<'_, ClusterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serve an additional kind
    pub fn register_kind(
        &self,
        group: &str,
        version: &str,
        kind: &str,
        plural: &str,
        namespaced: bool,
    ) -> DiscoveredResource {
        let gvk = GroupVersionKind::gvk(group, version, kind);
        let discovered = DiscoveredResource {
            resource: ApiResource::from_gvk_with_plural(&gvk, plural),
            namespaced,
        };
        let mut state = self.state();
        state.kinds.retain(|k| k.gvk() != gvk);
        state.kinds.push(discovered.clone());
        discovered
    }

    /// Store an object as-is, assigning `resourceVersion` and `uid`
    ///
    /// Existing objects with the same identity are replaced.
    pub fn insert(&self, mut object: DynamicObject) -> Result<DynamicObject, ClientError> {
        let mut state = self.state();
        let resource = state.kind_of(&object)?;
        let name = object_name(&object)?.to_string();
        let revision = state.next_revision();
        object.metadata.resource_version = Some(revision.clone());
        if object.metadata.uid.is_none() {
            object.metadata.uid = Some(format!("uid-{name}-{revision}"));
        }
        let key = key(&resource, object.metadata.namespace.as_deref(), &name);
        state.objects.insert(key, object.clone());
        Ok(object)
    }

    /// Store an object given as JSON
    pub fn insert_json(&self, value: serde_json::Value) -> Result<DynamicObject, ClientError> {
        self.insert(serde_json::from_value(value)?)
    }

    /// Current state of a stored object
    pub fn object(&self, group: &str, plural: &str, namespace: Option<&str>, name: &str) -> Option<DynamicObject> {
        let key = ObjectKey {
            group: group.to_string(),
            plural: plural.to_string(),
            namespace: namespace.unwrap_or_default().to_string(),
            name: name.to_string(),
        };
        self.state().objects.get(&key).cloned()
    }

    /// Current state of a stored Secret, decoded
    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.object("", "secrets", Some(namespace), name)
            .and_then(|obj| obj.try_parse::<Secret>().ok())
    }

    /// Make every subsequent create/update of `plural` fail with a conflict
    pub fn fail_writes(&self, plural: &str) {
        self.state().failing_writes.insert(plural.to_string());
    }

    /// Calls issued so far
    pub fn actions(&self) -> Vec<RecordedAction> {
        self.state().actions.clone()
    }

    /// Calls with the given verb against the given plural resource
    pub fn actions_for(&self, verb: Verb, resource: &str) -> Vec<RecordedAction> {
        self.state()
            .actions
            .iter()
            .filter(|a| a.verb == verb && a.resource == resource)
            .cloned()
            .collect()
    }

    pub fn clear_actions(&self) {
        self.state().actions.clear();
    }
}

#[async_trait]
impl ResourceClient for MemoryCluster {
    async fn get(
        &self,
        resource: &DiscoveredResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<DynamicObject>, ClientError> {
        let mut state = self.state();
        state.record(Verb::Get, resource, namespace, Some(name));
        Ok(state.objects.get(&key(resource, namespace, name)).cloned())
    }

    async fn list(
        &self,
        resource: &DiscoveredResource,
        namespace: Option<&str>,
        selector: &Selector,
    ) -> Result<Vec<DynamicObject>, ClientError> {
        let mut state = self.state();
        state.record(Verb::List, resource, namespace, None);
        let namespace = resource.scoped_namespace(namespace);
        let empty = BTreeMap::new();
        Ok(state
            .objects
            .iter()
            .filter(|(k, _)| k.group == resource.resource.group && k.plural == resource.resource.plural)
            .filter(|(k, _)| namespace.is_none_or(|ns| k.namespace == ns))
            .filter(|(_, obj)| selector.matches(obj.metadata.labels.as_ref().unwrap_or(&empty)))
            .map(|(_, obj)| obj.clone())
            .collect())
    }

    async fn create(
        &self,
        resource: &DiscoveredResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject, ClientError> {
        let name = object_name(object)?;
        let namespace = object.metadata.namespace.as_deref();
        let mut state = self.state();
        state.record(Verb::Create, resource, namespace, Some(name));

        let key = key(resource, namespace, name);
        if state.objects.contains_key(&key) {
            return Err(ClientError::AlreadyExists {
                kind: resource.resource.kind.clone(),
                name: name.to_string(),
            });
        }
        if state.failing_writes.contains(&resource.resource.plural) {
            return Err(ClientError::Conflict {
                kind: resource.resource.kind.clone(),
                name: name.to_string(),
                resource_version: String::new(),
            });
        }

        let mut stored = object.clone();
        let revision = state.next_revision();
        stored.metadata.uid = Some(format!("uid-{name}-{revision}"));
        stored.metadata.resource_version = Some(revision);
        state.objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        resource: &DiscoveredResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject, ClientError> {
        let name = object_name(object)?;
        let namespace = object.metadata.namespace.as_deref();
        let mut state = self.state();
        state.record(Verb::Update, resource, namespace, Some(name));

        let key = key(resource, namespace, name);
        let Some(current) = state.objects.get(&key) else {
            return Err(ClientError::NotFound {
                kind: resource.resource.kind.clone(),
                name: name.to_string(),
            });
        };
        let stale = object
            .metadata
            .resource_version
            .as_ref()
            .is_some_and(|rv| current.metadata.resource_version.as_ref() != Some(rv));
        if stale || state.failing_writes.contains(&resource.resource.plural) {
            return Err(ClientError::Conflict {
                kind: resource.resource.kind.clone(),
                name: name.to_string(),
                resource_version: object.metadata.resource_version.clone().unwrap_or_default(),
            });
        }

        let mut stored = object.clone();
        stored.metadata.uid.clone_from(&current.metadata.uid);
        stored.metadata.resource_version = Some(state.next_revision());
        state.objects.insert(key, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl KindDiscovery for MemoryCluster {
    async fn discover_kind(
        &self,
        gvk: &GroupVersionKind,
    ) -> Result<Option<DiscoveredResource>, ClientError> {
        Ok(self.state().kinds.iter().find(|k| k.gvk() == *gvk).cloned())
    }

    async fn discover_resource(
        &self,
        group: &str,
        version: &str,
        plural: &str,
    ) -> Result<Option<DiscoveredResource>, ClientError> {
        Ok(self
            .state()
            .kinds
            .iter()
            .find(|k| {
                k.resource.group == group && k.resource.version == version && k.resource.plural == plural
            })
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::LabelSelector;
    use serde_json::json;

    fn deployment(name: &str, labels: serde_json::Value) -> serde_json::Value {
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": name, "namespace": "default", "labels": labels},
            "spec": {}
        })
    }

    #[tokio::test]
    async fn test_update_with_stale_resource_version_conflicts() {
        let cluster = MemoryCluster::new();
        let stored = cluster.insert_json(deployment("app", json!({}))).unwrap();
        let resource = cluster.state().kind_of(&stored).unwrap();

        let first = cluster.update(&resource, &stored).await.unwrap();
        assert_ne!(first.metadata.resource_version, stored.metadata.resource_version);

        let err = cluster.update(&resource, &stored).await.unwrap_err();
        assert!(matches!(err, ClientError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_create_existing_object_fails() {
        let cluster = MemoryCluster::new();
        let stored = cluster.insert_json(deployment("app", json!({}))).unwrap();
        let resource = cluster.state().kind_of(&stored).unwrap();
        let err = cluster.create(&resource, &stored).await.unwrap_err();
        assert!(matches!(err, ClientError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_list_filters_by_selector_and_namespace() {
        let cluster = MemoryCluster::new();
        cluster
            .insert_json(deployment("a", json!({"connects-to": "database"})))
            .unwrap();
        cluster.insert_json(deployment("b", json!({"other": "x"}))).unwrap();
        let resource = cluster
            .discover_resource("apps", "v1", "deployments")
            .await
            .unwrap()
            .unwrap();

        let selector = LabelSelector::from_labels([("connects-to", "database")])
            .to_selector()
            .unwrap();
        let found = cluster.list(&resource, Some("default"), &selector).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].metadata.name.as_deref(), Some("a"));

        let elsewhere = cluster.list(&resource, Some("other"), &selector).await.unwrap();
        assert!(elsewhere.is_empty());
        assert_eq!(cluster.actions_for(Verb::List, "deployments").len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_kind_is_not_discovered() {
        let cluster = MemoryCluster::new();
        let gvk = GroupVersionKind::gvk("example.org", "v1", "Widget");
        assert!(cluster.discover_kind(&gvk).await.unwrap().is_none());
        cluster.register_kind("example.org", "v1", "Widget", "widgets", true);
        assert!(cluster.discover_kind(&gvk).await.unwrap().is_some());
    }
}
