use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, error, info, Level};
use tracing_subscriber::EnvFilter;

use pg_status::config::{self, MonitorParameters};
use pg_status::driver::PostgresExecutor;
use pg_status::health::{HostRegistry, Monitor, ReplicationProber};
use pg_status::metrics::start_metrics_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let mut params = load_or_default_config()?;
    params
        .apply_env()
        .context("Invalid pg_status__* environment override")?;

    // Configuration errors are fatal before monitoring starts
    let registry = Arc::new(HostRegistry::from_params(&params).context("Invalid host list")?);

    info!(
        hosts = registry.len(),
        max_fails = params.max_fails,
        sync_max_lag_ms = params.sync_max_lag_ms,
        sync_max_lag_bytes = params.sync_max_lag_bytes,
        "Monitor configured"
    );

    if let Some(addr) = params.metrics_addr.clone() {
        tokio::spawn(async move {
            if let Err(e) = start_metrics_server(&addr).await {
                error!(addr = %addr, error = %e, "Metrics server failed");
            }
        });
    }

    let prober = ReplicationProber::from_params(PostgresExecutor::new(), &params);
    let mut handle = Monitor::new(registry, prober, params.probe_interval()).start();

    shutdown_signal().await;

    handle.stop().await;
    info!("pg_status stopped");
    Ok(())
}

fn load_or_default_config() -> anyhow::Result<MonitorParameters> {
    let config_paths = ["config/pg_status.toml", "pg_status.toml"];

    for path in config_paths {
        match config::load_optional_config(path)
            .with_context(|| format!("Failed to load config from {}", path))?
        {
            Some(config) => {
                info!(path = path, "Loaded configuration");
                return Ok(config);
            }
            None => debug!(path = path, "Config file not found"),
        }
    }

    info!("Using default configuration");
    Ok(MonitorParameters::default())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT"),
        _ = terminate => info!("SIGTERM"),
    }
}
