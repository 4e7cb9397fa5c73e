//! # ServiceBinding Spec
//!
//! Main CRD specification and default values.

use k8s_openapi::apimachinery::pkg::apis::meta::v1 as meta;
use kube::core::{ParseExpressionError, Selector};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::status::ServiceBindingStatus;

/// ServiceBinding Custom Resource Definition
///
/// Binds one application workload to one or more service resources. The
/// controller collects data from the services into a Secret named after the
/// binding and injects that Secret into the application.
///
/// # Example
///
/// ```yaml
/// apiVersion: binding.operators.coreos.com/v1alpha1
/// kind: ServiceBinding
/// metadata:
///   name: my-app-db
///   namespace: default
/// spec:
///   application:
///     group: apps
///     version: v1
///     resource: deployments
///     labelSelector:
///       matchLabels:
///         connects-to: database
///   services:
///     - group: postgresql.example.org
///       version: v1alpha1
///       kind: Database
///       name: db1
///   mappings:
///     - name: MY_DB_NAME
///       value: '{{ .v1alpha1.postgresql_example_org.Database.db1.status.dbName }}'
/// ```
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ServiceBinding",
    group = "binding.operators.coreos.com",
    version = "v1alpha1",
    namespaced,
    status = "ServiceBindingStatus",
    shortname = "sbr",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"BindingReady\")].status"}"#,
    printcolumn = r#"{"name":"Secret", "type":"string", "jsonPath":".status.secret"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBindingSpec {
    /// Application workload(s) receiving the binding Secret
    #[serde(default)]
    pub application: Option<Application>,
    /// Services providing binding data, processed in order
    #[serde(default)]
    pub services: Vec<Service>,
    /// Custom variables rendered from templates over the collected services
    #[serde(default)]
    pub mappings: Vec<Mapping>,
    /// Global prefix prepended to every derived variable name
    #[serde(default)]
    pub env_var_prefix: Option<String>,
    /// Also collect data from Secrets and ConfigMaps owned by each service
    #[serde(default)]
    pub detect_binding_resources: bool,
    /// Mount the Secret as files instead of injecting it as environment
    #[serde(default)]
    pub bind_as_files: bool,
    /// Mount path used when `bindAsFiles` is set
    /// Defaults to `<binding root>/<binding name>`
    #[serde(default)]
    pub mount_path: Option<String>,
}

/// Application reference
///
/// Either `name` or `labelSelector` selects the workload(s). The
/// group/version/resource triple defaults to `apps/v1/deployments`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Plural resource name, e.g. `deployments`
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub label_selector: Option<LabelSelector>,
    #[serde(default)]
    pub binding_path: Option<BindingPath>,
}

/// Where in the application the binding is written
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BindingPath {
    /// Dotted path to the containers list, e.g. `spec.template.spec.containers`
    #[serde(default)]
    pub containers_path: Option<String>,
    /// Dotted path to a string field receiving the Secret name
    /// When set, containers are left untouched
    #[serde(default)]
    pub secret_path: Option<String>,
}

/// Service reference
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Selects the first matching service (by name) when `name` is not set
    #[serde(default)]
    pub label_selector: Option<LabelSelector>,
    /// Defaults to the binding namespace
    #[serde(default)]
    pub namespace: Option<String>,
    /// Short name exposing the service at the top level of mapping templates
    #[serde(default)]
    pub id: Option<String>,
    /// Overrides the kind as the service prefix; an empty string disables it
    #[serde(default)]
    pub env_var_prefix: Option<String>,
}

/// Custom variable rendered from a template
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    pub name: String,
    pub value: String,
}

/// Label selector
///
/// Same shape as the Kubernetes `LabelSelector`, kept local so the CRD schema
/// stays self-contained; an empty selector has no constraints. Matching and
/// rendering go through [`Selector`].
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
    #[serde(default)]
    pub match_expressions: Vec<LabelSelectorRequirement>,
}

/// A single set-based selector requirement
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelectorRequirement {
    pub key: String,
    /// One of `In`, `NotIn`, `Exists`, `DoesNotExist`
    pub operator: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl LabelSelector {
    /// Build a selector from `matchLabels` only
    pub fn from_labels<I, K, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            match_labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            match_expressions: Vec::new(),
        }
    }

    /// A selector with no constraints
    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty() && self.match_expressions.is_empty()
    }

    /// Parse into a selector for list calls and local matching
    ///
    /// Fails on unknown operators and on `In`/`NotIn` without values.
    pub fn to_selector(&self) -> Result<Selector, ParseExpressionError> {
        Selector::try_from(meta::LabelSelector::from(self))
    }
}

impl From<&LabelSelector> for meta::LabelSelector {
    fn from(selector: &LabelSelector) -> Self {
        Self {
            match_labels: (!selector.match_labels.is_empty()).then(|| selector.match_labels.clone()),
            match_expressions: (!selector.match_expressions.is_empty()).then(|| {
                selector
                    .match_expressions
                    .iter()
                    .map(|req| meta::LabelSelectorRequirement {
                        key: req.key.clone(),
                        operator: req.operator.clone(),
                        values: (!req.values.is_empty()).then(|| req.values.clone()),
                    })
                    .collect()
            }),
        }
    }
}
