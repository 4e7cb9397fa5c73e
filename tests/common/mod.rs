//! Common test utilities for binder integration tests
//!
//! Provides an in-memory cluster seeded with the `Database` service kind and
//! helpers for building bindings and reading back what the binder wrote.

#![allow(dead_code, reason = "each test binary uses a different subset of helpers")]

use k8s_openapi::ByteString;
use serde_json::{json, Value};
use service_binding_controller::binder::{Binder, BinderOptions};
use service_binding_controller::constants::BOUND_BY_ANNOTATION;
use service_binding_controller::crd::ServiceBinding;
use service_binding_controller::resolver::memory::Verb;
use service_binding_controller::resolver::{KindDiscovery, MemoryCluster, ResourceClient};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const NAMESPACE: &str = "default";
pub const DB_GROUP: &str = "postgresql.example.org";
pub const DB_VERSION: &str = "v1alpha1";

/// Cluster serving Secrets, ConfigMaps, Deployments and Databases
pub fn cluster() -> Arc<MemoryCluster> {
    let cluster = MemoryCluster::new();
    cluster.register_kind(DB_GROUP, DB_VERSION, "Database", "databases", true);
    Arc::new(cluster)
}

/// A Database whose status carries the usual binding fields
pub fn database(name: &str) -> Value {
    json!({
        "apiVersion": format!("{DB_GROUP}/{DB_VERSION}"),
        "kind": "Database",
        "metadata": {
            "name": name,
            "namespace": NAMESPACE,
            "uid": format!("{name}-uid"),
            "labels": {"app": name},
        },
        "spec": {"dbName": name, "image": "docker.io/postgres"},
        "status": {
            "dbConfigMap": format!("{name}-config"),
            "dbCredentials": format!("{name}-credentials"),
            "dbName": name,
        }
    })
}

/// A Deployment labelled `connects-to=database` with a single container
pub fn deployment(name: &str) -> Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": name,
            "namespace": NAMESPACE,
            "labels": {"connects-to": "database"},
        },
        "spec": {
            "template": {
                "spec": {
                    "containers": [{"name": "app", "image": "quay.io/example/app"}]
                }
            }
        }
    })
}

pub fn insert(cluster: &MemoryCluster, value: Value) {
    cluster.insert_json(value).expect("fixture should be insertable");
}

/// Service entry for a Database referenced by name
pub fn db_service(name: &str) -> Value {
    json!({"group": DB_GROUP, "version": DB_VERSION, "kind": "Database", "name": name})
}

/// Application entry selecting deployments labelled `connects-to=database`
pub fn connects_to_database() -> Value {
    json!({
        "group": "apps",
        "version": "v1",
        "resource": "deployments",
        "labelSelector": {"matchLabels": {"connects-to": "database"}}
    })
}

/// A ServiceBinding with the given spec, as read from the API server
pub fn binding(name: &str, spec: Value) -> ServiceBinding {
    serde_json::from_value(json!({
        "apiVersion": "binding.operators.coreos.com/v1alpha1",
        "kind": "ServiceBinding",
        "metadata": {
            "name": name,
            "namespace": NAMESPACE,
            "uid": format!("{name}-uid"),
            "generation": 1,
        },
        "spec": spec
    }))
    .expect("binding fixture should deserialize")
}

pub fn options(cluster: &Arc<MemoryCluster>) -> BinderOptions {
    let client = Arc::clone(cluster) as Arc<dyn ResourceClient>;
    let discovery = Arc::clone(cluster) as Arc<dyn KindDiscovery>;
    BinderOptions::new(client, discovery)
}

pub fn binder(cluster: &Arc<MemoryCluster>, binding: ServiceBinding) -> Binder {
    Binder::new(options(cluster).binding(binding)).expect("binding should be valid")
}

/// Decoded entries of the Secret named `name`
pub fn secret_data(cluster: &MemoryCluster, name: &str) -> BTreeMap<String, String> {
    let secret = cluster
        .secret(NAMESPACE, name)
        .unwrap_or_else(|| panic!("secret {name} should exist"));
    secret
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|(k, ByteString(v))| (k, String::from_utf8(v).expect("utf-8 secret value")))
        .collect()
}

/// Field tree of a stored Deployment
pub fn deployment_tree(cluster: &MemoryCluster, name: &str) -> Value {
    let object = cluster
        .object("apps", "deployments", Some(NAMESPACE), name)
        .unwrap_or_else(|| panic!("deployment {name} should exist"));
    serde_json::to_value(object).expect("deployment should serialize")
}

/// Status and reason of a condition in a bind result
pub fn condition(
    result: &service_binding_controller::binder::BindingResult,
    condition_type: service_binding_controller::binder::conditions::ConditionType,
) -> (bool, String) {
    let state = result
        .conditions
        .get(condition_type)
        .unwrap_or_else(|| panic!("condition {condition_type} should be set"));
    (state.status, state.reason.clone())
}

/// Bindings recorded on a stored Database
pub fn bound_by(cluster: &MemoryCluster, name: &str) -> Option<String> {
    cluster
        .object(DB_GROUP, "databases", Some(NAMESPACE), name)
        .and_then(|db| db.metadata.annotations)
        .and_then(|annotations| annotations.get(BOUND_BY_ANNOTATION).cloned())
}

/// Names of the objects of `plural` that received an update
pub fn updated(cluster: &MemoryCluster, plural: &str) -> Vec<String> {
    cluster
        .actions_for(Verb::Update, plural)
        .into_iter()
        .filter_map(|action| action.name)
        .collect()
}
