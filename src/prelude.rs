//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use service_binding_controller::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (ServiceBinding, Service, Mapping, etc.)
//! - The binder and its options
//! - Cluster collaborator traits and their implementations
//! - Reconciler types and configuration
//! - Common error types

// CRD types - most commonly used
pub use crate::crd::*;

// Binder - core binding functionality
pub use crate::binder::conditions::ConditionType;
pub use crate::binder::{Binder, BinderOptions, BindingResult};

// Cluster collaborators
pub use crate::resolver::{
    KindDiscovery, KubeDiscovery, KubeResourceClient, MemoryCluster, ResourceClient,
};

// Reconciler types - controller functionality
pub use crate::controller::reconciler::{reconcile, Reconciler, ReconcilerError};

// Config types
pub use crate::config::ControllerConfig;

// Common error types
pub use crate::error::BindError;
pub use crate::mapping::MappingError;
