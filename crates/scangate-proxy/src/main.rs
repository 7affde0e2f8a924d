//! ScanGate
//!
//! Chat-completions gateway with runtime security scanning of prompts and
//! responses.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use scangate_core::StreamFormat;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info, warn};

use scangate_proxy::cli::Cli;
use scangate_proxy::{create_router, AppState, GatewayConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);

    let config = match GatewayConfig::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    let state = AppState::new(config, Some(metrics_handle))?;
    log_banner(&state);

    let addr: SocketAddr = state.config.listen_addr().parse()?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Gateway listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn log_banner(state: &AppState) {
    let config = &state.config;
    info!("Starting ScanGate");
    info!("Profile: {}", config.scanner.profile);
    info!("API key: {}", config.scanner.masked_api_key());
    info!("Scanner: {}", config.scanner.endpoint);
    info!("LLM: {}", state.generator.mode());
    info!("Block status code: {}", config.block_status_code);
    info!("Port: {}", config.server.port);
    info!("Endpoints: POST /v1/chat/completions, GET /health, GET /metrics");
    info!("Streaming formats: {}", StreamFormat::supported());
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("scangate=debug,scangate_proxy=debug,scangate_policy=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("scangate=info,scangate_proxy=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "scangate_requests_total",
        "Total number of chat completion requests"
    );
    metrics::describe_counter!(
        "scangate_decisions_total",
        "Total number of policy decisions by phase and action"
    );
    metrics::describe_histogram!(
        "scangate_scan_latency_us",
        metrics::Unit::Microseconds,
        "Scanner call latency in microseconds by phase"
    );
    metrics::describe_counter!(
        "scangate_scan_failures_total",
        "Scanner calls that failed and were let through"
    );
    metrics::describe_counter!(
        "scangate_streams_total",
        "Streaming replies by format"
    );
    metrics::describe_counter!("scangate_errors_total", "Total number of errors by type");

    info!("Metrics exporter initialized");
    Ok(handle)
}
