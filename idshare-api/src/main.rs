use anyhow::Result;
use clap::Parser;
use idshare_api::{build_router, AppState};
use idshare_core::core_disclosure::{DisclosureManager, DisclosureSqlStore};
use idshare_core::metrics::{init_metrics, install_prometheus_exporter};
use idshare_core::{init_logging_with_config, Config, LogConfig};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "idshare-api", version, about = "Identity-variant disclosure API server")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides server.bind_address
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    config.validate()?;

    init_logging_with_config(LogConfig::from_settings(&config.logging)?)?;

    if config.metrics.enabled {
        install_prometheus_exporter(&config.metrics.bind_address.to_string())?;
    } else {
        init_metrics();
    }

    let store = DisclosureSqlStore::open(
        &config.store.database_path,
        config.store.pool_size,
        config.store.busy_timeout,
    )?;
    info!(path = %config.store.database_path.display(), "Store opened");

    let state = AppState::new(DisclosureManager::new(store), &config.auth);
    let listener = TcpListener::bind(config.server.bind_address).await?;
    info!(addr = %config.server.bind_address, "idshare API listening");

    let drain = Arc::new(Notify::new());
    let server = axum::serve(listener, build_router(state))
        .with_graceful_shutdown({
            let drain = drain.clone();
            async move { drain.notified().await }
        })
        .into_future();

    // Completes only if draining outlives the shutdown timeout
    let shutdown = {
        let timeout = config.server.shutdown_timeout;
        async move {
            shutdown_signal().await;
            info!(?timeout, "Shutdown signal received, draining connections");
            drain.notify_one();
            tokio::time::sleep(timeout).await;
        }
    };

    tokio::select! {
        result = server => result?,
        _ = shutdown => warn!("Shutdown timeout elapsed with connections still open"),
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to listen for SIGTERM");
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
