//! # Binder
//!
//! The bind pipeline for one `ServiceBinding`:
//!
//! 1. **Application resolution** - default the application reference and find
//!    the workloads it targets
//! 2. **Collection** - resolve every service, derive variables, assemble the
//!    lookup context and evaluate mappings (`CollectionReady`)
//! 3. **Secret materialization** - write the Secret named after the binding
//!    and mark every bound service with the binding
//! 4. **Injection** - wire the Secret into every workload (`InjectionReady`)
//! 5. **Readiness** - compute `BindingReady`
//!
//! A bind always returns a fully populated [`BindingResult`]; nothing written
//! by an earlier phase is rolled back when a later one fails.
//!
//! ## Module Structure
//!
//! - `application.rs` - application defaulting and resolution
//! - `bindable.rs` - `BindableFields` seam and the annotation-based default
//! - `context.rs` - per-service contexts
//! - `detect.rs` - owned Secret/ConfigMap detection
//! - `envvars.rs` - variable key composition and derivation
//! - `lookup.rs` - lookup context for mapping templates
//! - `mark.rs` - bound-by annotation on services
//! - `secret.rs` - binding Secret materialization
//! - `injection.rs` - application mutation
//! - `conditions.rs` - readiness conditions

pub mod application;
pub mod bindable;
pub mod conditions;
pub mod context;
pub mod detect;
pub mod envvars;
pub mod injection;
pub mod lookup;
pub mod mark;
pub mod secret;

use crate::constants::DEFAULT_BINDING_ROOT;
use crate::crd::ServiceBinding;
use crate::error::BindError;
use crate::mapping;
use crate::resolver::{KindDiscovery, Resolved, ResourceClient, ResourceIdentity, ResourceLocator};
use application::{resolve_application, ApplicationOutcome, ApplicationTarget};
use bindable::{BindableFields, DescriptorBindableFields};
use conditions::{reasons, BindingConditions, ConditionType};
use context::{ServiceContext, ServiceContextBuilder};
use injection::InjectionMode;
use kube::ResourceExt;
use lookup::LookupContext;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything needed to build a [`Binder`]
#[derive(Clone)]
pub struct BinderOptions {
    pub binding: Option<ServiceBinding>,
    pub client: Arc<dyn ResourceClient>,
    pub discovery: Arc<dyn KindDiscovery>,
    pub bindable_fields: Arc<dyn BindableFields>,
    /// Directory containing file bindings; parent of the default mount path
    pub binding_root: String,
}

impl fmt::Debug for BinderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinderOptions")
            .field("binding", &self.binding.as_ref().map(ResourceExt::name_any))
            .field("binding_root", &self.binding_root)
            .finish_non_exhaustive()
    }
}

impl BinderOptions {
    pub fn new(client: Arc<dyn ResourceClient>, discovery: Arc<dyn KindDiscovery>) -> Self {
        Self {
            binding: None,
            client,
            discovery,
            bindable_fields: Arc::new(DescriptorBindableFields),
            binding_root: DEFAULT_BINDING_ROOT.to_string(),
        }
    }

    #[must_use]
    pub fn binding(mut self, binding: ServiceBinding) -> Self {
        self.binding = Some(binding);
        self
    }

    #[must_use]
    pub fn bindable_fields(mut self, bindable_fields: Arc<dyn BindableFields>) -> Self {
        self.bindable_fields = bindable_fields;
        self
    }

    #[must_use]
    pub fn binding_root(mut self, binding_root: impl Into<String>) -> Self {
        self.binding_root = binding_root.into();
        self
    }
}

/// Outcome of one bind
#[derive(Debug)]
pub struct BindingResult {
    /// Final Secret entries
    pub data: BTreeMap<String, Vec<u8>>,
    pub conditions: BindingConditions,
    /// Name of the Secret, once materialized
    pub secret: Option<String>,
    /// Whether this bind created or updated the Secret
    pub secret_written: bool,
    /// Services newly marked with the binding
    pub services_marked: Vec<ResourceIdentity>,
    /// Workloads that consume the Secret
    pub applications: Vec<ResourceIdentity>,
    /// Error that ended the bind, if any
    pub error: Option<BindError>,
}

impl BindingResult {
    fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            conditions: BindingConditions::default(),
            secret: None,
            secret_written: false,
            services_marked: Vec::new(),
            applications: Vec::new(),
            error: None,
        }
    }

    /// Whether retrying may help
    pub fn requeue(&self) -> bool {
        self.error.as_ref().is_some_and(BindError::is_retryable)
    }

    pub fn is_ready(&self) -> bool {
        self.conditions.is_true(ConditionType::BindingReady)
    }

    fn fail(mut self, error: BindError) -> Self {
        self.conditions
            .set_false(ConditionType::BindingReady, error.reason(), error.to_string());
        self.error = Some(error);
        self
    }
}

/// Binds the services of one `ServiceBinding` to its application
pub struct Binder {
    binding: ServiceBinding,
    name: String,
    namespace: String,
    client: Arc<dyn ResourceClient>,
    discovery: Arc<dyn KindDiscovery>,
    bindable_fields: Arc<dyn BindableFields>,
    application: ApplicationTarget,
    mode: InjectionMode,
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("application", &self.application)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Binder {
    /// Validate options and prepare a bind
    pub fn new(options: BinderOptions) -> Result<Self, BindError> {
        let binding = options
            .binding
            .ok_or_else(|| BindError::InvalidOptions("binding is required".to_string()))?;
        let name = binding
            .metadata
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| BindError::InvalidOptions("binding has no name".to_string()))?;
        let namespace = binding.namespace().unwrap_or_else(|| "default".to_string());

        if binding.spec.application.is_none() && binding.spec.services.is_empty() {
            return Err(BindError::InvalidOptions(
                "binding declares neither an application nor services".to_string(),
            ));
        }
        for (i, service) in binding.spec.services.iter().enumerate() {
            if service.version.is_empty() || service.kind.is_empty() {
                return Err(BindError::InvalidOptions(format!(
                    "services[{i}] needs a version and a kind"
                )));
            }
            context::service_ref(service, &namespace)?;
        }

        let mode = if binding.spec.bind_as_files {
            let root = options.binding_root.trim_end_matches('/');
            let mount_path = binding
                .spec
                .mount_path
                .clone()
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| format!("{root}/{name}"));
            let binding_root = std::path::Path::new(&mount_path)
                .parent()
                .map_or_else(|| root.to_string(), |p| p.to_string_lossy().into_owned());
            InjectionMode::Files {
                mount_path,
                binding_root,
            }
        } else {
            InjectionMode::EnvFrom
        };

        Ok(Self {
            application: ApplicationTarget::from_spec(binding.spec.application.as_ref())?,
            binding,
            name,
            namespace,
            client: options.client,
            discovery: options.discovery,
            bindable_fields: options.bindable_fields,
            mode,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Run the bind pipeline
    pub async fn bind(&self) -> BindingResult {
        let mut result = BindingResult::new();
        let locator = ResourceLocator::new(self.client.as_ref(), self.discovery.as_ref());

        let application = resolve_application(&locator, &self.application, &self.namespace).await;

        // Collection
        let services = match self.collect().await {
            Ok((data, services)) => {
                result.data = data;
                result
                    .conditions
                    .set_true(ConditionType::CollectionReady, reasons::DATA_COLLECTED);
                services
            }
            Err(error) => {
                warn!(binding = %self.name, namespace = %self.namespace, error = %error, "data collection failed");
                result
                    .conditions
                    .set_false(ConditionType::CollectionReady, error.reason(), error.to_string());
                result.conditions.set_false(
                    ConditionType::InjectionReady,
                    error.reason(),
                    "data collection failed",
                );
                return result.fail(error);
            }
        };

        let application = match application {
            Ok(outcome) => outcome,
            Err(error) => {
                let error = BindError::from(error);
                result
                    .conditions
                    .set_false(ConditionType::InjectionReady, error.reason(), error.to_string());
                return result.fail(error);
            }
        };

        // Secret materialization
        let secret = secret::build_secret(&self.binding, &self.namespace, &result.data);
        match secret::write_secret(self.client.as_ref(), self.discovery.as_ref(), &secret).await {
            Ok(written) => result.secret_written = written,
            Err(source) => {
                let error = BindError::SecretWrite {
                    secret: self.name.clone(),
                    source,
                };
                result
                    .conditions
                    .set_false(ConditionType::InjectionReady, error.reason(), error.to_string());
                return result.fail(error);
            }
        }
        result.secret = Some(self.name.clone());

        if let Err(error) = self.mark_services(&services, &mut result).await {
            result
                .conditions
                .set_false(ConditionType::InjectionReady, error.reason(), error.to_string());
            return result.fail(error);
        }

        // Injection
        match application {
            ApplicationOutcome::Empty => {
                info!(binding = %self.name, "application selector is empty, skipping injection");
                result.conditions.set_false(
                    ConditionType::InjectionReady,
                    reasons::EMPTY_APPLICATION,
                    "application selector is empty",
                );
                result
                    .conditions
                    .set_true(ConditionType::BindingReady, reasons::BINDING_SUCCEEDED);
            }
            ApplicationOutcome::NotFound => {
                info!(binding = %self.name, "application not found, skipping injection");
                result.conditions.set_false(
                    ConditionType::InjectionReady,
                    reasons::APPLICATION_NOT_FOUND,
                    "application not found",
                );
                if self.binding.spec.services.is_empty() {
                    result
                        .conditions
                        .set_true(ConditionType::BindingReady, reasons::BINDING_SUCCEEDED);
                } else {
                    result.conditions.set_false(
                        ConditionType::BindingReady,
                        reasons::APPLICATION_NOT_FOUND,
                        "application not found",
                    );
                }
            }
            ApplicationOutcome::Resolved(applications) => {
                let mut first_error = None;
                let mut messages = Vec::new();
                for application in &applications {
                    let identity = application.identity();
                    match injection::inject_application(
                        self.client.as_ref(),
                        application,
                        &self.name,
                        &self.application.injection_path,
                        &self.mode,
                    )
                    .await
                    {
                        Ok(_) => result.applications.push(identity),
                        Err(source) => {
                            warn!(binding = %self.name, application = %identity, error = %source, "injection failed");
                            let error = BindError::Injection {
                                application: identity.to_string(),
                                source,
                            };
                            messages.push(error.to_string());
                            first_error.get_or_insert(error);
                        }
                    }
                }

                if let Some(error) = first_error {
                    result.conditions.set_false(
                        ConditionType::InjectionReady,
                        error.reason(),
                        messages.join("; "),
                    );
                    return result.fail(error);
                }
                result
                    .conditions
                    .set_true(ConditionType::InjectionReady, reasons::APPLICATION_INJECTED);
                result
                    .conditions
                    .set_true(ConditionType::BindingReady, reasons::BINDING_SUCCEEDED);
            }
        }

        debug!(binding = %self.name, entries = result.data.len(), ready = result.is_ready(), "bind finished");
        result
    }

    /// Record the binding on every resolved service, once per service
    async fn mark_services(&self, services: &[Resolved], result: &mut BindingResult) -> Result<(), BindError> {
        let binding_key = format!("{}/{}", self.namespace, self.name);
        let mut seen = BTreeSet::new();
        for service in services {
            let identity = service.identity();
            if !seen.insert(identity.to_string()) {
                continue;
            }
            match mark::mark_service(self.client.as_ref(), service, &binding_key).await {
                Ok(true) => result.services_marked.push(identity),
                Ok(false) => {}
                Err(source) => {
                    warn!(binding = %self.name, service = %identity, error = %source, "marking service failed");
                    return Err(BindError::ServiceMark {
                        service: identity.to_string(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve services and compute the final Secret entries
    ///
    /// Also returns the resolved services in declaration order.
    async fn collect(&self) -> Result<(BTreeMap<String, Vec<u8>>, Vec<Resolved>), BindError> {
        let builder = ServiceContextBuilder {
            client: self.client.as_ref(),
            discovery: self.discovery.as_ref(),
            bindable: self.bindable_fields.as_ref(),
            namespace: &self.namespace,
            detect_binding_resources: self.binding.spec.detect_binding_resources,
        };
        let (services, contexts): (Vec<Resolved>, Vec<ServiceContext>) =
            builder.build(&self.binding.spec.services).await?.into_iter().unzip();

        let global_prefix = self.binding.spec.env_var_prefix.as_deref();
        let mut lookup = LookupContext::new();
        let mut entries = BTreeMap::new();
        for context in &contexts {
            lookup.add_service(context)?;
            entries.extend(context.prefixed_env_vars(global_prefix));
        }

        let lookup = lookup.into_value();
        for mapping in &self.binding.spec.mappings {
            let value = mapping::evaluate_mapping(mapping, &lookup).map_err(|source| BindError::Mapping {
                name: mapping.name.clone(),
                source,
            })?;
            entries.insert(mapping.name.clone(), value);
        }

        let entries: BTreeMap<String, Vec<u8>> = entries
            .into_iter()
            .map(|(k, v)| (k, v.into_bytes()))
            .collect();
        Ok((entries, services))
    }
}
