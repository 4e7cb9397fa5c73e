//! # Service Binding Controller
//!
//! A Kubernetes controller that binds service resources to application workloads.
//!
//! For every `ServiceBinding` it:
//!
//! 1. **Collects** binding data from the referenced services (annotated
//!    fields, status entries, owned Secrets and ConfigMaps, custom mappings)
//! 2. **Materializes** the data into a Secret named after the binding
//! 3. **Injects** the Secret into the application workloads, as environment
//!    variables or as files under `SERVICE_BINDING_ROOT`
//! 4. **Reports** `CollectionReady`, `InjectionReady` and `BindingReady` conditions
//!
//! Configuration comes from environment variables, see [`ControllerConfig`].
//!
//! [`ControllerConfig`]: service_binding_controller::config::ControllerConfig

use anyhow::Result;
use service_binding_controller::runtime::{initialization::initialize, watch_loop::run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;
    run_watch_loop(init.bindings, init.reconciler, init.server_state).await
}
