//! Courier - concurrent message broker
//!
//! # Usage
//!
//! ```bash
//! # Run the broker (default)
//! courier
//! courier --config configs/courier.toml --print-topology
//!
//! # Send one command to a running broker
//! courier send --object subscriber --command add \
//!     --route orders --channel primary --arg3 127.0.0.1:9001
//! courier send --object delivery --command send \
//!     --route orders --arg4 customer-42 --payload hello
//! ```

mod cmd;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use courier_config::Config;

/// Courier - concurrent message broker
#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Print the topology as JSON at startup and shutdown
    #[arg(long, global = true)]
    print_topology: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the broker
    Serve(cmd::serve::ServeArgs),

    /// Build and send a single command frame
    Send(cmd::send::SendArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Send(args)) => {
            let level = cli.log_level.unwrap_or_else(|| "warn".to_string());
            logging::init(&level)?;
            cmd::send::run(args).await
        }
        // No subcommand = run the broker
        Some(Command::Serve(_)) | None => {
            let level = resolve_log_level(cli.log_level.as_deref(), cli.config.as_deref());
            let reload = logging::init(&level)?;
            let args = cmd::serve::ServeArgs {
                config: cli.config,
                print_topology: cli.print_topology,
            };
            cmd::serve::run(args, reload).await
        }
    }
}

/// Resolve log level: CLI flag > config file > default "info"
fn resolve_log_level(cli_level: Option<&str>, config_path: Option<&std::path::Path>) -> String {
    if let Some(level) = cli_level {
        return level.to_string();
    }

    let path = config_path.unwrap_or(std::path::Path::new(cmd::serve::DEFAULT_CONFIG_PATH));
    if path.exists()
        && let Ok(config) = Config::from_file(path)
    {
        return config.log.level.as_str().to_string();
    }

    "info".to_string()
}
