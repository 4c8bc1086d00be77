//! Credit Card Recommendation Service - Main Entry Point
//!
//! Loads (or trains) the recommendation model and serves it over HTTP.

use anyhow::{Context, Result};
use card_recommender::{
    config::{AppConfig, LoggingConfig, DEFAULT_CONFIG_PATH},
    metrics::{MetricsReporter, ServiceMetrics},
    models::{persistence, ModelStore},
    server::{self, AppState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable naming an alternative config file
const CONFIG_PATH_ENV: &str = "CARD_RECOMMENDER_CONFIG";

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    // RUST_LOG takes precedence over the configured level
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!(
            "card_recommender={level},tower_http={level}",
            level = logging.level
        ))
        .context("Invalid logging level")?,
    };

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format.as_str() {
        "json" => subscriber.json().init(),
        _ => subscriber.init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    // Load configuration
    let config = AppConfig::load_from_path(&config_path)?;
    init_tracing(&config.logging)?;

    info!("Starting Credit Card Recommendation Service");
    info!(path = %config_path, "Configuration loaded successfully");

    // Initialize metrics
    let metrics = Arc::new(ServiceMetrics::new());

    // Load the stored model or train a fresh one
    let store = ModelStore::new(&config.model);
    let model = {
        let store = store.clone();
        let training = config.training.clone();
        tokio::task::spawn_blocking(move || persistence::initialize(&store, &training))
            .await
            .context("Model initialization task panicked")??
    };
    info!(
        trained = model.is_trained(),
        params = model.network().param_count(),
        "Recommendation model ready"
    );

    // Start metrics reporter
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let state = AppState::new(model, store, config.training.clone(), metrics.clone());
    let app = server::router(state);

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!(address = %address, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    // Print final summary
    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}
