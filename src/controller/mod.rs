//! # Controller
//!
//! Kubernetes-facing controller modules for the Service Binding Controller.
//!
//! - `backoff`: exponential backoff for retryable bind failures
//! - `reconciler`: reconciliation of `ServiceBinding` resources
//! - `server`: HTTP server for metrics and health checks

pub mod backoff;
pub mod reconciler;
pub mod server;
