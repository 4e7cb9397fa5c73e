//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use crate::config::ControllerConfig;
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::crd::ServiceBinding;
use crate::observability;
use anyhow::{Context, Result};
use kube::{api::Api, api::ListParams, Client};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const SERVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const SERVER_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// API for the ServiceBinding CRD, scoped to the watched namespace
    pub bindings: Api<ServiceBinding>,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Reconciler setup
pub async fn initialize() -> Result<InitializationResult> {
    // Required for rustls 0.23+ when no default provider is set via features
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        return Err(anyhow::anyhow!("Failed to install rustls crypto provider"));
    }

    let config = ControllerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("service_binding_controller={}", config.log_level).into()
            }),
        )
        .init();

    info!("Starting Service Binding Controller v{}", env!("CARGO_PKG_VERSION"));

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::new());
    let server_state_clone = Arc::clone(&server_state);
    let server_port = config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let bindings: Api<ServiceBinding> = match &config.watch_namespace {
        Some(namespace) => {
            info!("Watching ServiceBindings in namespace '{}'", namespace);
            Api::namespaced(client.clone(), namespace)
        }
        None => {
            info!("Watching ServiceBindings in all namespaces");
            Api::all(client.clone())
        }
    };

    check_crd_queryable(&bindings).await;

    let reconciler = Arc::new(Reconciler::new(client.clone(), config));

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        bindings,
        reconciler,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > SERVER_STARTUP_TIMEOUT {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                SERVER_STARTUP_TIMEOUT.as_secs()
            ));
        }

        tokio::time::sleep(SERVER_POLL_INTERVAL).await;
    }
}

/// Log how many bindings exist before the watch starts
///
/// A failure here usually means the CRD is not installed; the watch keeps
/// retrying, so it is only reported.
async fn check_crd_queryable(bindings: &Api<ServiceBinding>) {
    match bindings.list(&ListParams::default()).await {
        Ok(list) => info!(
            "CRD is queryable, found {} existing ServiceBinding resources",
            list.items.len()
        ),
        Err(e) => warn!(
            "ServiceBinding CRD is not queryable yet ({}); install it with `crdgen | kubectl apply -f -`",
            e
        ),
    }
}
