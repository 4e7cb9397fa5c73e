//! Service Binding Controller Library
//!
//! This library provides the binder and the controller runtime around it.
//! Tests are included in the module files and under `tests/`.
//!
//! ## Quick Start
//!
//! ```rust
//! use service_binding_controller::prelude::*;
//! ```
//!
//! The binder can run against any [`resolver::ResourceClient`], including the
//! in-memory [`resolver::MemoryCluster`] used by the tests.

pub mod binder;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod error;
pub mod mapping;
pub mod observability;
pub mod prelude;
pub mod resolver;
pub mod runtime;
pub mod unstructured;
