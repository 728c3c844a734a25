//! Price server - hosts house price prediction sessions over HTTP
//!
//! Each session owns its artifact and lifecycle state; the process only
//! shares the pipeline configuration, metrics and the session map.

use anyhow::Result;
use price_server::{api, config::ServerConfig};
use pricing_lib::{
    health::{components, HealthRegistry},
    observability::PricingMetrics,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting price-server");

    let config = ServerConfig::load()?;
    info!(
        api_port = config.api_port,
        reference_year = config.pipeline.reference_year,
        session_ttl_secs = config.session_ttl_secs,
        "Server configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::ARTIFACTS).await;
    health_registry.register(components::INFERENCE).await;

    let metrics = PricingMetrics::new();
    let app_state = Arc::new(api::AppState::new(&config, health_registry.clone(), metrics));
    app_state
        .logger
        .log_startup(SERVER_VERSION, config.pipeline.reference_year);

    // Sessions load the default artifact themselves; this only surfaces a bad path early
    if let Some(source) = &config.default_artifact {
        match app_state.loader.load(source) {
            Ok(artifact) => info!(version = %artifact.version(), "Default artifact verified"),
            Err(e) => {
                warn!(error = %e, "Default artifact failed to load, sessions start without one");
                health_registry
                    .set_degraded(components::ARTIFACTS, e.to_string())
                    .await;
            }
        }
    }

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let sweeper_handle = tokio::spawn(app_state.store.clone().run_sweeper(
        Duration::from_secs(config.sweep_interval_secs),
        shutdown_tx.subscribe(),
    ));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state.clone()));

    let reason = tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => "API server exited",
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    "API server failed"
                }
                Err(e) => {
                    error!(error = %e, "API server task panicked");
                    "API server task panicked"
                }
            }
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            "SIGINT received"
        }
    };

    health_registry.set_ready(false).await;
    app_state.logger.log_shutdown(reason);
    let _ = shutdown_tx.send(());
    let _ = sweeper_handle.await;
    info!("Shutting down");

    Ok(())
}
