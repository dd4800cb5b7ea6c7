//! sift-ingest - image ingestion and object-search service
//!
//! Accepts dropped images and zip archives, submits every image to the
//! remote analysis service, matches the analysis against the active criteria
//! and keeps the matching images for review.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sift_common::events::EventBus;
use sift_ingest::config::{Args, IngestConfig};
use sift_ingest::services::{HttpAnalysisClient, StaticTokenProvider};
use sift_ingest::{AppState, SearchSession};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = IngestConfig::load(&args).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!(
                "sift_ingest={level},sift_common={level},tower_http=info",
                level = config.log_level
            )
            .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.write_config {
        let path = args
            .config_path()
            .context("No config path given and no default config directory")?;
        config
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Settings written to TOML: {}", path.display());
        return Ok(());
    }

    info!("Starting sift-ingest");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Analysis service: {}", config.analysis_base_url);
    if config.auth_token.is_none() {
        warn!("No auth token configured; analysis requests are sent unauthenticated");
    }

    let tokens = Arc::new(StaticTokenProvider::new(config.auth_token.clone()));
    let client = HttpAnalysisClient::new(&config.analysis_base_url, config.request_timeout, tokens)
        .context("Failed to build analysis client")?;

    let event_bus = EventBus::new(config.event_capacity);
    let session = Arc::new(SearchSession::new(
        Arc::new(client),
        event_bus.clone(),
        config.max_entry_bytes,
    ));
    let app = sift_ingest::build_router(AppState::new(session, event_bus));

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
