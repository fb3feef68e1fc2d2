//! Serve command - run the broker
//!
//! Startup order: config, runtime snapshot, token store, connection pool,
//! broker, TCP listener. Shutdown runs the other way: stop accepting, drain
//! every partition, cancel pending dials.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use courier_auth::TokenStore;
use courier_config::{Config, RuntimeHandle};
use courier_pipeline::Broker;
use courier_pool::{ConnectionPool, PoolConfig};
use courier_sources::{TcpSource, TcpSourceConfig};

use crate::logging::LogReload;

/// Config file used when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "configs/courier.toml";

/// How long the listener gets to finish open connections
const SOURCE_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Serve command arguments
///
/// Filled from the global `--config` and `--print-topology` flags.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Explicit config file; must exist when given
    #[arg(skip)]
    pub config: Option<PathBuf>,

    #[arg(skip)]
    pub print_topology: bool,
}

/// Run the serve command
pub async fn run(args: ServeArgs, log_reload: LogReload) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        "courier starting"
    );

    let mut config = load_config(args.config.as_deref())?;
    if args.print_topology {
        config.broker.print_topology = true;
    }

    if let Err(e) = run_server(config, log_reload).await {
        error!(error = %e, "server error");
        return Err(e);
    }

    info!("courier shutdown complete");
    Ok(())
}

/// Explicit path must exist; otherwise the default path if present, else defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        info!(config = %path.display(), "using config file");
        return Config::from_file(path).context("failed to load configuration");
    }

    let default = Path::new(DEFAULT_CONFIG_PATH);
    if default.exists() {
        info!(config = %default.display(), "using config file");
        return Config::from_file(default).context("failed to load configuration");
    }

    info!("no config file found, using defaults");
    Ok(Config::default())
}

fn pool_config(config: &Config) -> PoolConfig {
    PoolConfig::default()
        .with_dial_timeout(config.pool.dial_timeout)
        .with_idle_timeout(config.pool.idle_timeout)
        .with_max_idle_per_address(config.pool.max_idle_per_address)
        .with_tcp_keepalive(config.pool.keepalive)
}

async fn run_server(config: Config, log_reload: LogReload) -> Result<()> {
    let cancel = CancellationToken::new();

    let runtime = RuntimeHandle::new(config.runtime());
    let log_task = log_reload.follow(&runtime);

    let tokens = TokenStore::from_tokens(&config.security.tokens)
        .context("invalid [security] tokens")?;
    if tokens.is_empty() {
        warn!("no security tokens configured, every runtime update will be rejected");
    }

    let pool = ConnectionPool::new(pool_config(&config));
    let broker = Broker::new(runtime.clone(), pool, Arc::new(tokens));

    // Listener binds once from the initial snapshot
    let snapshot = runtime.load();
    let source_config = TcpSourceConfig {
        address: snapshot.address.clone(),
        port: snapshot.port,
        workers: snapshot.workers,
        ..TcpSourceConfig::from_server(&config.server)
    };
    let source = TcpSource::bind(source_config, Arc::clone(&broker))
        .await
        .context("failed to start TCP listener")?;
    let source_metrics = source.metrics_handle();
    let source_task = tokio::spawn(source.run(cancel.clone()));

    info!(
        partitions = snapshot.partitions,
        queue_size = snapshot.queue_size,
        transform_timeout = ?snapshot.transform_timeout,
        auto_consolidate = snapshot.auto_consolidate,
        "courier running"
    );
    print_topology(&broker, "startup");

    wait_for_shutdown().await;
    info!("shutdown signal received, stopping broker...");

    cancel.cancel();
    match tokio::time::timeout(SOURCE_SHUTDOWN_TIMEOUT, source_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!(error = %e, "TCP source stopped with error"),
        Ok(Err(e)) => warn!(error = %e, "TCP source task panicked"),
        Err(_) => warn!("TCP source did not stop within timeout, continuing shutdown"),
    }

    print_topology(&broker, "shutdown");

    info!("waiting for partitions to drain...");
    broker.shutdown().await;

    let source_stats = source_metrics.snapshot();
    info!(
        connections = source_stats.connections_total,
        frames = source_stats.frames_received,
        frames_malformed = source_stats.frames_malformed,
        frames_rejected = source_stats.frames_rejected,
        bytes = source_stats.bytes_received,
        "TCP source totals"
    );

    log_task.abort();
    Ok(())
}

/// Print the topology as JSON when the live snapshot asks for it
fn print_topology(broker: &Broker, stage: &str) {
    if !broker.runtime().load().print_topology {
        return;
    }
    match serde_json::to_string_pretty(&broker.topology()) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!(stage, error = %e, "failed to serialize topology"),
    }
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
#[path = "serve_test.rs"]
mod tests;
