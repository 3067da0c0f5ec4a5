//! Scout Relay Server
//!
//! HTTP relay that collects the upstream people-search NDJSON stream into a
//! single JSON array and proxies profile lookups.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use scout_core::config;
use scout_core::tracing_init::{DEFAULT_FILTER, LogFormat, init_tracing};
use scout_relay::{AppState, UpstreamClient, build_router};

#[derive(Parser, Debug)]
#[command(name = "scout-relay")]
#[command(version, about = "Scout relay server - people search stream and profile proxy")]
struct Args {
    /// Path to a JSON config file.
    #[arg(long, env = "SCOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on. Overrides the config file and environment.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Log output format: `text` or `json`.
    #[arg(long, default_value = "text", env = "SCOUT_LOG_FORMAT")]
    log_format: LogFormat,

    /// OpenTelemetry OTLP endpoint for traces and metrics export
    /// (e.g. `http://localhost:4317`). Requires the `metrics` feature.
    #[cfg(feature = "metrics")]
    #[arg(long, env = "SCOUT_METRICS_ENDPOINT")]
    metrics_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(DEFAULT_FILTER, args.log_format)?;

    #[cfg(feature = "metrics")]
    let metrics_guard = match args.metrics_endpoint.as_deref() {
        Some(endpoint) => Some(scout_core::metrics::init_metrics(
            endpoint,
            env!("CARGO_PKG_NAME"),
        )?),
        None => None,
    };

    let mut config = config::load_config(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.server.listen_addr = addr;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.listen_addr,
        search_url = %config.upstream.search_url,
        origins = ?config.server.allowed_origins,
        "Starting scout-relay"
    );

    let upstream = Arc::new(UpstreamClient::new(config.upstream.clone())?);
    let app = build_router(AppState { upstream }, &config.server);

    let listener = tokio::net::TcpListener::bind(config.server.listen_addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP server ready");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    #[cfg(feature = "metrics")]
    if let Some(guard) = metrics_guard {
        guard.shutdown()?;
    }

    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let sigterm_future = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let sigterm_future = std::future::pending::<()>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C shutdown signal");
        }
        () = sigterm_future => {
            info!("Received SIGTERM shutdown signal");
        }
    }
}
