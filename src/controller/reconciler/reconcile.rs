//! # Reconcile
//!
//! Runs one bind for a `ServiceBinding` and records the outcome.
//!
//! Requeue policy:
//! - success: periodic resync after `success_requeue_secs`
//! - retryable failure: `Err`, so the error policy applies per-binding backoff
//! - non-retryable failure: requeue after `reconciliation_error_requeue_secs`

use crate::binder::{Binder, BinderOptions};
use crate::controller::reconciler::status::{build_status, update_status};
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::crd::ServiceBinding;
use crate::error::BindError;
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

pub async fn reconcile(
    binding: Arc<ServiceBinding>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = binding.name_any();
    let namespace = binding.namespace().unwrap_or_else(|| "default".to_string());
    let span = tracing::info_span!(
        "reconcile",
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
        resource.generation = binding.metadata.generation.unwrap_or(0),
    );

    async move {
        observability::metrics::increment_binds();
        let resource_key = format!("{}/{}", namespace, name);

        let options = BinderOptions::new(Arc::clone(&ctx.resources), Arc::clone(&ctx.discovery))
            .binding((*binding).clone())
            .binding_root(ctx.config.binding_root.as_str());
        let binder = match Binder::new(options) {
            Ok(binder) => binder,
            Err(e) => return Ok(invalid_binding(&ctx, &e)),
        };

        let start = Instant::now();
        let result = binder.bind().await;
        observability::metrics::observe_bind_duration(start.elapsed().as_secs_f64());

        if result.secret_written {
            observability::metrics::increment_secrets_written();
        }
        observability::metrics::increment_applications_injected(result.applications.len());

        let status = build_status(&binding, &result, chrono::Utc::now());
        update_status(&ctx, &binding, &status).await?;

        match result.error {
            Some(e) if e.is_retryable() => {
                warn!("Bind failed with a retryable error: {}", e);
                Err(ReconcilerError::Bind(e))
            }
            Some(e) => {
                error!("Bind failed: {}", e);
                observability::metrics::increment_bind_errors(e.reason());
                ctx.reset_backoff(&resource_key);
                observability::metrics::increment_requeues_total("error-requeue");
                Ok(Action::requeue(ctx.config.reconciliation_error_requeue_duration()))
            }
            None => {
                if result.is_ready() {
                    info!(
                        "Bound {} entries into Secret '{}' for {} application(s)",
                        result.data.len(),
                        result.secret.as_deref().unwrap_or(&name),
                        result.applications.len()
                    );
                } else {
                    debug!("Bind finished without a ready application");
                }
                ctx.reset_backoff(&resource_key);
                observability::metrics::increment_requeues_total("resync");
                Ok(Action::requeue(ctx.config.success_requeue_duration()))
            }
        }
    }
    .instrument(span)
    .await
}

/// A binding that can never be bound as written waits for an edit
fn invalid_binding(ctx: &Reconciler, error: &BindError) -> Action {
    error!("Invalid ServiceBinding: {}", error);
    observability::metrics::increment_bind_errors(error.reason());
    observability::metrics::increment_requeues_total("error-requeue");
    Action::requeue(ctx.config.reconciliation_error_requeue_duration())
}
