//! Right-sizing controller - keeps right-sizing addon resources in sync
//!
//! This binary runs on the hub cluster, seeding configuration records and
//! publishing the recording rules they describe to managed clusters.

use anyhow::{Context, Result};
use rightsizing_controller::{
    api,
    config::ControllerConfig,
    triggers::{self, Trigger, TRIGGER_QUEUE_CAPACITY},
};
use rightsizing_lib::{HealthRegistry, KubeStore, Reconciler, ResourceStore, RightSizingMetrics, StructuredLogger};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const CONTROLLER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting rightsizing-controller");

    let config = ControllerConfig::load()?;
    let options = config.options();
    info!(
        namespace_enabled = config.namespace_enabled,
        virtualization_enabled = config.virtualization_enabled,
        config_namespace = %config.config_namespace,
        "Controller configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;
    let metrics = RightSizingMetrics::new();

    let instance = std::env::var("POD_NAME").unwrap_or_else(|_| "rightsizing-controller".to_string());
    let logger = StructuredLogger::new(instance);
    logger.log_startup(CONTROLLER_VERSION, &config.config_namespace);

    let kube_store = KubeStore::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let client = kube_store.client();
    let store: Arc<dyn ResourceStore> = Arc::new(kube_store);

    let reconciler = Reconciler::new(store)
        .with_health(health_registry.clone())
        .with_logger(logger.clone());

    let app_state = Arc::new(api::AppState::new(health_registry.clone(), metrics));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let (tx, rx) = mpsc::channel(TRIGGER_QUEUE_CAPACITY);
    tx.send(Trigger::Startup)
        .await
        .context("Trigger queue closed before startup")?;

    let resync_handle = tokio::spawn(triggers::resync(config.resync_interval(), tx.clone()));
    let watch_handle = tokio::spawn(triggers::watch_config_records(
        client,
        config.config_namespace.clone(),
        tx,
    ));
    let worker_handle = tokio::spawn(triggers::run_worker(
        reconciler,
        options,
        health_registry,
        rx,
    ));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
        served = api_handle => {
            match served {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    logger.log_shutdown("API server failed");
                }
                Err(e) => {
                    error!(error = %e, "API server task panicked");
                    logger.log_shutdown("API server task panicked");
                }
            }
        }
    }

    // Resources are left in place; uninstall flows own cleanup.
    resync_handle.abort();
    watch_handle.abort();
    worker_handle.abort();
    info!("Shutting down");

    Ok(())
}
