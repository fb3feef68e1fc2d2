//! Tracing subscriber with a reloadable level filter

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

use courier_config::{LogLevel, RuntimeHandle};

/// Swaps the active level filter
#[derive(Clone)]
pub struct LogReload {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl LogReload {
    /// Replace the filter with `level`
    pub fn set_level(&self, level: LogLevel) -> Result<()> {
        let filter = EnvFilter::try_new(level.as_str())?;
        self.handle.reload(filter)?;
        Ok(())
    }

    /// Follow `verbosity` in every runtime snapshot installed from now on
    pub fn follow(self, runtime: &RuntimeHandle) -> tokio::task::JoinHandle<()> {
        let mut changes = runtime.subscribe();
        let mut current = runtime.load().verbosity;

        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let level = changes.borrow_and_update().verbosity;
                if level == current {
                    continue;
                }
                match self.set_level(level) {
                    Ok(()) => {
                        tracing::info!(from = %current, to = %level, "log level changed");
                        current = level;
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to change log level"),
                }
            }
        })
    }
}

/// Install the global subscriber
///
/// Unparseable levels fall back to `info`.
pub fn init(level: &str) -> Result<LogReload> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .init();

    Ok(LogReload { handle })
}
