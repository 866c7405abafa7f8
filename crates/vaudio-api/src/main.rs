//! Axum API server binary.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{info, warn};

use vaudio_api::{create_router, metrics, spawn_job_reaper, ApiConfig, AppState};
use vaudio_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    vaudio_worker::init_tracing();

    info!("Starting vaudio-api");

    // Load configuration
    let config = ApiConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    info!(
        "API config: host={}, port={}, format={}, work_dir={}",
        config.host,
        config.port,
        worker_config.audio_format,
        worker_config.work_dir.display()
    );

    tokio::fs::create_dir_all(&worker_config.work_dir)
        .await
        .with_context(|| format!("creating work dir {}", worker_config.work_dir.display()))?;

    let state = AppState::new(config.clone(), worker_config);

    if let Err(e) = state.service.converter().check_available() {
        warn!("Converter not available, jobs will fail until it is installed: {}", e);
    }

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("installing Prometheus recorder")?)
    } else {
        None
    };

    let reaper = spawn_job_reaper(&state.service);
    let service = state.service.clone();

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    reaper.abort();
    service.shutdown();

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
