//! # Watch Loop
//!
//! Controller watch loop that monitors ServiceBinding resources and triggers
//! reconciliation when changes are detected.

use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::ServiceBinding;
use crate::runtime::error_policy::handle_reconciliation_error;
use futures::StreamExt;
use kube::api::Api;
use kube_runtime::{controller, watcher, Controller};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Run the controller watch loop until a shutdown signal arrives
///
/// Readiness is dropped as soon as the signal is received so the pod is
/// taken out of rotation while in-flight reconciliations finish.
pub async fn run_watch_loop(
    bindings: Api<ServiceBinding>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let shutdown_server_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, initiating graceful shutdown...");
            shutdown_server_state.set_ready(false);
        }
    });

    let concurrency =
        u16::try_from(reconciler.config.max_concurrent_reconciliations).unwrap_or(u16::MAX);
    let watch_span = tracing::span!(
        tracing::Level::INFO,
        "controller.watch",
        operation = "watch_loop"
    );

    info!("Starting controller watch loop...");
    Controller::new(bindings, watcher::Config::default().any_semantic())
        .with_config(controller::Config::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error, reconciler)
        .for_each(|res| async move {
            match res {
                Ok((obj, action)) => {
                    debug!(resource.name = obj.name.as_str(), action = ?action, "watch.event.reconciled");
                }
                Err(e) => warn!("Controller stream error: {}", e),
            }
        })
        .instrument(watch_span)
        .await;

    info!("Controller stopped gracefully");
    Ok(())
}
