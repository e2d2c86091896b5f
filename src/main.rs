//! Basking Relay Binary Entry Point
//!
//! Runs the webhook server, the report pages and the daily export.
//! Core functionality is provided by the `basking_relay` library crate.

use basking_relay::{
    config::AppConfig,
    export::ExportScheduler,
    server::{AppState, create_router},
    storage::StorageBuilder,
};
use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Basking Relay - SMS telemetry ingest for basking stations
#[derive(Parser, Debug)]
#[command(name = "basking-relay", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "BASKING_CONFIG"
    )]
    config: String,

    /// Server bind address (overrides config file)
    #[arg(long, env = "BASKING_SERVER_BIND")]
    server_bind: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, env = "BASKING_SERVER_PORT")]
    server_port: Option<u16>,

    /// Store file path (overrides config file)
    #[arg(long, env = "BASKING_STORE_PATH")]
    store_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,basking_relay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Basking Relay - SMS telemetry ingest");

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file
    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = AppConfig::load(&cli.config)?;

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(bind) = cli.server_bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.server_port {
        config.server.port = port;
    }
    if let Some(path) = cli.store_path {
        config.storage.path = path;
    }
    config.validate()?;

    tracing::info!(
        "Server: {}:{}, Store: {}",
        config.server.bind,
        config.server.port,
        config.storage.path,
    );

    // Build storage layer
    let handles = StorageBuilder::new(&config.storage.path)
        .channel_capacity(config.storage.channel_capacity)
        .build()?;

    tracing::info!("Storage initialized");

    // Daily export
    let scheduler = if config.export.enabled {
        let schedule = config.export.schedule()?;
        let uploader = config.export.to_uploader()?;

        let mut scheduler = ExportScheduler::new().await?;
        scheduler
            .register(&schedule, handles.reader.clone(), uploader)
            .await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Daily export disabled");
        None
    };

    // Create web server state
    let app_state = AppState::new(handles.reader.clone(), handles.writer.clone());

    // Build Axum router
    let app = create_router(app_state);

    // Parse bind address
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    tracing::info!("Web server listening on: http://{}", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(scheduler))
        .await?;

    // In-flight webhook calls have drained; stop the writer last.
    tracing::info!("Shutting down storage...");
    match tokio::task::spawn_blocking(move || handles.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("Failed to shutdown storage: {}", e),
        Err(e) => tracing::error!("Storage shutdown task failed: {}", e),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Setup graceful shutdown signal handler.
async fn shutdown_signal(scheduler: Option<ExportScheduler>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }

    if let Some(scheduler) = scheduler {
        tracing::info!("Shutting down export scheduler...");
        if let Err(e) = scheduler.shutdown().await {
            tracing::error!("Failed to shutdown export scheduler: {}", e);
        }
    }
}
