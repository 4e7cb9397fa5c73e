//! # Runtime
//!
//! Process-level wiring around the reconciler.
//!
//! - `initialization`: crypto provider, tracing, metrics, server and client setup
//! - `watch_loop`: the `kube_runtime` controller driving reconciliation
//! - `error_policy`: per-binding backoff for failed reconciliations

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
