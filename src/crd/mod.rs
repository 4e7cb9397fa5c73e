//! # Custom Resource Definitions
//!
//! CRD types for the Service Binding Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - ServiceBinding specification (application, services, mappings)
//! - `status.rs` - Status types for tracking binding readiness

mod spec;
mod status;

pub use spec::{
    Application, BindingPath, LabelSelector, LabelSelectorRequirement, Mapping, Service,
    ServiceBinding, ServiceBindingSpec,
};
pub use status::{Condition, ServiceBindingStatus};
