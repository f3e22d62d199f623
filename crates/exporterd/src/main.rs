//! exporterd — the Portainer exporter daemon.
//!
//! Single binary that assembles the exporter:
//! - Snapshot store
//! - Portainer client
//! - Collector loop (background task)
//! - HTTP server for `/metrics` and `/health`
//!
//! # Usage
//!
//! ```text
//! PORTAINER_URL=https://portainer:9443 PORTAINER_TOKEN=ptr_xxx exporterd
//! exporterd --portainer-url https://portainer:9443 --scrape-interval 15
//! ```

use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use exporter_core::{ConfigArgs, ExporterConfig};
use exporter_metrics::Collector;
use exporter_portainer::PortainerClient;
use exporter_state::SnapshotStore;

#[derive(Parser)]
#[command(name = "exporterd", about = "Prometheus exporter for container state via Portainer", version)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.config.log_level, cli.log_format);

    let config = ExporterConfig::try_from(cli.config).map_err(|e| {
        error!(error = %e, "invalid configuration, refusing to start");
        e
    })?;

    run(config).await
}

async fn run(config: ExporterConfig) -> anyhow::Result<()> {
    info!(
        portainer_url = %config.portainer_url,
        interval_secs = config.scrape_interval.as_secs(),
        "Portainer exporter starting"
    );

    // ── Initialize subsystems ──────────────────────────────────

    let store = SnapshotStore::new();

    let client = PortainerClient::new(&config)?;
    info!(timeout_secs = config.request_timeout.as_secs(), "portainer client initialized");

    let collector = Collector::new(client, store.clone(), config.scrape_interval);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let collector_handle = tokio::spawn(async move {
        collector.run(shutdown_rx).await;
    });

    // ── Start HTTP server ──────────────────────────────────────

    let router = exporter_api::build_router(store, config.stale_after);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "metrics server listening on /metrics and /health");

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // The collector drops any in-flight cycle once signalled.
    let _ = collector_handle.await;

    info!("Portainer exporter stopped");
    Ok(())
}

/// Install the tracing subscriber. `LOG_LEVEL` accepts a bare level in any
/// case (`INFO`, `warning`) or a full filter directive.
fn init_tracing(log_level: &str, format: LogFormat) {
    let directive = normalize_log_level(log_level);
    let (filter, rejected) = match EnvFilter::try_new(&directive) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new("info"), Some(e)),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }

    if let Some(e) = rejected {
        warn!(log_level, error = %e, "invalid LOG_LEVEL, falling back to info");
    }
}

/// Map Python-style level names onto tracing's.
fn normalize_log_level(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "" => "info".to_string(),
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        _ => lowered,
    }
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
