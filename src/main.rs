// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::chart_service::ChartService;
use crate::application::streaming_service::PanelStreamingService;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::metrics_store_repository::MetricsStoreRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    available_metrics, build_chart_model, health_check, list_experiments, list_runs, query_chart,
    stream_panels,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = load_app_config()?;

    // RUST_LOG overrides the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Create repository (infrastructure layer)
    let repository = Arc::new(MetricsStoreRepository::new(
        config.metrics_store.base_url.clone(),
        config.metrics_store.timeout_secs,
    )?);

    // Create services (application layer)
    let chart_service = ChartService::new(repository);
    let streaming_service = PanelStreamingService::new(chart_service.clone());

    // Create application state
    let state = Arc::new(AppState {
        chart_service,
        streaming_service,
    });

    // Build router (presentation layer)
    // Compression is handled in the response builders, so no CompressionLayer here
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/experiments", get(list_experiments))
        .route("/runs", get(list_runs))
        .route("/metrics", get(available_metrics))
        .route("/charts/build", post(build_chart_model))
        .route("/charts", post(query_chart))
        .route("/panels", post(stream_panels))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind_addr))?;
    tracing::info!(
        "Starting experiment-charts service on {} (metrics store: {})",
        addr,
        config.metrics_store.base_url
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
