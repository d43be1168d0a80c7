//! bird-serve - Run the Birdcast HTTP API

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bird_serve::{build_app, AppState};
use clap::Parser;
use libbirdcast::service::BirdcastService;
use libbirdcast::Config;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "bird-serve")]
#[command(version)]
#[command(about = "Run the Birdcast HTTP API", long_about = None)]
struct Cli {
    /// Address to listen on (overrides [server].bind)
    #[arg(short, long)]
    bind: Option<String>,

    /// Configuration file (defaults to $BIRDCAST_CONFIG or the XDG config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    libbirdcast::logging::init_with_verbosity(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };

    let bind = cli.bind.unwrap_or_else(|| config.server.bind.clone());
    let upload_dir = config.server.resolve_upload_dir();
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", upload_dir.display()))?;

    let service = BirdcastService::from_config(config).context("Failed to start service")?;
    info!(
        twitter_configured = service.publisher().is_configured(),
        upload_dir = %upload_dir.display(),
        "Starting Birdcast API on {}",
        bind
    );

    let app = build_app(AppState::new(Arc::new(service), upload_dir));
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
