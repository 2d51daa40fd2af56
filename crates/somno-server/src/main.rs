use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use somno_server::{Config, RecordService, routes};

/// Sleep tracker REST server.
///
/// Records sleep intervals, serves aggregate statistics, and optionally
/// proxies an LLM for sleep advice.
#[derive(Debug, Parser)]
#[command(name = "somnod", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Path to config file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    let db = somno_db::Database::open(&config.database_path).context("failed to open database")?;

    let advice = match &config.anthropic_api_key {
        Some(key) => Some(somno_llm::Client::new(key).context("invalid advice credential")?),
        None => {
            tracing::info!("no advice credential configured; /sleep/advice will return an error");
            None
        }
    };

    let service = Arc::new(RecordService::new(db, advice, config.advice_model.clone()));
    let app = routes::router(service)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown handler");
    }
}
