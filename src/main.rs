//! UPI Fraud Detection API - Main Entry Point
//!
//! Loads the scaler and model once, then serves predictions over HTTP.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use upi_fraud_api::{
    config::{AppConfig, LoggingConfig},
    metrics::{MetricsReporter, ServiceMetrics},
    router, AppState, InferenceEngine,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    init_logging(&config.logging)?;
    info!("Starting UPI Fraud Detection API v{}", env!("CARGO_PKG_VERSION"));

    // Artifacts stay loaded for the life of the process
    let engine = InferenceEngine::from_config(&config)?;

    let metrics = Arc::new(ServiceMetrics::new());
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let state = AppState::new(engine, metrics.clone(), config.pages.clone());
    let app = router(state);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    metrics.print_summary();

    Ok(())
}

/// Install the global subscriber; `RUST_LOG` overrides the configured level
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!(
            "upi_fraud_api={level},tower_http={level}",
            level = logging.level
        ))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
