//! # Reconciler
//!
//! Core reconciliation logic for `ServiceBinding` resources.
//!
//! The reconciler:
//! - Watches `ServiceBinding` resources
//! - Runs the binder for each one
//! - Patches the status subresource with conditions and the Secret name
//! - Decides when the binding is looked at again
//!
//! ## Module Structure
//!
//! - `reconcile.rs` - the reconcile entry point and requeue policy
//! - `status.rs` - status construction and patching
//! - `types.rs` - `Reconciler` context, errors and backoff state

pub mod reconcile;
pub mod status;
pub mod types;

// Re-export public API
pub use reconcile::reconcile;
pub use status::{build_status, update_status};
pub use types::{BackoffState, Reconciler, ReconcilerError};
