//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default requeue interval for reconciliation errors (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Default periodic resync interval after a successful bind (seconds)
pub const DEFAULT_SUCCESS_REQUEUE_SECS: u64 = 300;

/// Default exponential backoff starting value (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 1000;

/// Default exponential backoff maximum value (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Field manager recorded on status patches
pub const DEFAULT_FIELD_MANAGER: &str = "service-binding-controller";

/// Root directory under which bindings are mounted when `bindAsFiles` is set
pub const DEFAULT_BINDING_ROOT: &str = "/bindings";

/// Environment variable injected next to file bindings, pointing at the binding root
pub const SERVICE_BINDING_ROOT_ENV: &str = "SERVICE_BINDING_ROOT";

/// Annotation prefix declaring bindable fields on a service resource
///
/// `servicebinding.operators.coreos.com/status.dbName: binding:env:attribute`
pub const BINDABLE_ANNOTATION_PREFIX: &str = "servicebinding.operators.coreos.com/";

/// Annotation value declaring a single string field
pub const BINDABLE_ATTRIBUTE: &str = "binding:env:attribute";

/// Annotation value declaring a mapping of string fields
pub const BINDABLE_OBJECT: &str = "binding:env:object";

/// Annotation on a bound service listing the bindings that consume it
///
/// The value is a comma-separated, sorted list of `namespace/name` keys.
pub const BOUND_BY_ANNOTATION: &str = "binding.operators.coreos.com/bound-by";

/// Default application group when the binding does not declare one
pub const DEFAULT_APPLICATION_GROUP: &str = "apps";

/// Default application version when the binding does not declare one
pub const DEFAULT_APPLICATION_VERSION: &str = "v1";

/// Default application resource when the binding does not declare one
pub const DEFAULT_APPLICATION_RESOURCE: &str = "deployments";

/// Path to the pod template containers of a Deployment-like workload
pub const DEFAULT_CONTAINERS_PATH: &[&str] = &["spec", "template", "spec", "containers"];

