//! # Application Resolution
//!
//! Defaulting of the application reference and resolution of the workloads
//! that receive the binding.

use crate::constants::{
    DEFAULT_APPLICATION_GROUP, DEFAULT_APPLICATION_RESOURCE, DEFAULT_APPLICATION_VERSION,
    DEFAULT_CONTAINERS_PATH,
};
use crate::crd::Application;
use crate::error::BindError;
use crate::resolver::{LocateError, Resolved, ResourceLocator, ResourceRef, ResourceType, Target};
use crate::unstructured::split_path;
use kube::core::Selector;

/// Where the binding is written inside the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionPath {
    /// Path to the containers sequence
    Containers(Vec<String>),
    /// Path to a string field receiving the Secret name
    SecretField(Vec<String>),
}

/// Application reference with every default applied
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationTarget {
    pub group: String,
    pub version: String,
    pub resource: String,
    pub name: Option<String>,
    /// `None` when the selector has no constraints
    pub selector: Option<Selector>,
    pub injection_path: InjectionPath,
}

fn non_empty(value: Option<&String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

impl ApplicationTarget {
    /// Apply defaults to the application reference
    ///
    /// Fails when the label selector cannot be parsed.
    pub fn from_spec(application: Option<&Application>) -> Result<Self, BindError> {
        let default = Application::default();
        let app = application.unwrap_or(&default);
        let binding_path = app.binding_path.as_ref();

        let secret_path = binding_path
            .and_then(|p| p.secret_path.as_deref())
            .map(split_path)
            .filter(|p| !p.is_empty());
        let injection_path = match secret_path {
            Some(path) => InjectionPath::SecretField(path),
            None => InjectionPath::Containers(
                binding_path
                    .and_then(|p| p.containers_path.as_deref())
                    .map(split_path)
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| DEFAULT_CONTAINERS_PATH.iter().map(|s| (*s).to_string()).collect()),
            ),
        };

        let selector = match app.label_selector.as_ref().filter(|s| !s.is_empty()) {
            Some(selector) => Some(selector.to_selector().map_err(|e| {
                BindError::InvalidOptions(format!("application.labelSelector: {e}"))
            })?),
            None => None,
        };

        Ok(Self {
            group: app.group.clone().unwrap_or_else(|| {
                if app.version.is_none() {
                    DEFAULT_APPLICATION_GROUP.to_string()
                } else {
                    String::new()
                }
            }),
            version: non_empty(app.version.as_ref(), DEFAULT_APPLICATION_VERSION),
            resource: non_empty(app.resource.as_ref(), DEFAULT_APPLICATION_RESOURCE),
            name: app.name.clone().filter(|n| !n.is_empty()),
            selector,
            injection_path,
        })
    }

    /// No name and no selector constraints
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.selector.is_none()
    }

    fn reference(&self, namespace: &str) -> ResourceRef {
        ResourceRef {
            resource_type: ResourceType::Resource {
                group: self.group.clone(),
                version: self.version.clone(),
                plural: self.resource.clone(),
            },
            namespace: Some(namespace.to_string()),
            target: match &self.name {
                Some(name) => Target::Name(name.clone()),
                None => Target::Selector(self.selector.clone().unwrap_or_default()),
            },
        }
    }
}

/// Outcome of application resolution
#[derive(Debug, Clone)]
pub enum ApplicationOutcome {
    /// Workloads to inject, sorted by name
    Resolved(Vec<Resolved>),
    /// Neither a name nor selector constraints were given
    Empty,
    NotFound,
}

/// Resolve the workloads targeted by the application reference
pub async fn resolve_application(
    locator: &ResourceLocator<'_>,
    target: &ApplicationTarget,
    namespace: &str,
) -> Result<ApplicationOutcome, LocateError> {
    if target.is_empty() {
        return Ok(ApplicationOutcome::Empty);
    }
    let found = locator.resolve_all(&target.reference(namespace)).await?;
    if found.is_empty() {
        Ok(ApplicationOutcome::NotFound)
    } else {
        Ok(ApplicationOutcome::Resolved(found))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{BindingPath, LabelSelector, LabelSelectorRequirement};

    #[test]
    fn test_missing_application_defaults_to_empty_deployments() {
        let target = ApplicationTarget::from_spec(None).unwrap();
        assert!(target.is_empty());
        assert_eq!(
            (target.group.as_str(), target.version.as_str(), target.resource.as_str()),
            ("apps", "v1", "deployments")
        );
        assert_eq!(
            target.injection_path,
            InjectionPath::Containers(vec![
                "spec".to_string(),
                "template".to_string(),
                "spec".to_string(),
                "containers".to_string()
            ])
        );
    }

    #[test]
    fn test_custom_containers_path() {
        let app = Application {
            binding_path: Some(BindingPath {
                containers_path: Some("spec.some.path".to_string()),
                secret_path: None,
            }),
            ..Application::default()
        };
        assert_eq!(
            ApplicationTarget::from_spec(Some(&app)).unwrap().injection_path,
            InjectionPath::Containers(vec!["spec".to_string(), "some".to_string(), "path".to_string()])
        );
    }

    #[test]
    fn test_secret_path_replaces_containers() {
        let app = Application {
            binding_path: Some(BindingPath {
                containers_path: Some("spec.containers".to_string()),
                secret_path: Some("spec.some.path".to_string()),
            }),
            ..Application::default()
        };
        assert_eq!(
            ApplicationTarget::from_spec(Some(&app)).unwrap().injection_path,
            InjectionPath::SecretField(vec!["spec".to_string(), "some".to_string(), "path".to_string()])
        );
    }

    #[test]
    fn test_core_group_is_kept_when_version_given() {
        let app = Application {
            version: Some("v1".to_string()),
            resource: Some("pods".to_string()),
            name: Some("p".to_string()),
            ..Application::default()
        };
        let target = ApplicationTarget::from_spec(Some(&app)).unwrap();
        assert_eq!(target.group, "");
        assert!(!target.is_empty());
    }

    #[test]
    fn test_unknown_selector_operator_is_invalid() {
        let app = Application {
            label_selector: Some(LabelSelector {
                match_labels: std::collections::BTreeMap::new(),
                match_expressions: vec![LabelSelectorRequirement {
                    key: "tier".to_string(),
                    operator: "Near".to_string(),
                    values: vec!["db".to_string()],
                }],
            }),
            ..Application::default()
        };
        let err = ApplicationTarget::from_spec(Some(&app)).unwrap_err();
        assert_eq!(err.reason(), "InvalidOptions");
    }
}
