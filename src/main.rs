//! CLI entry point for sensor-relay.
//!
//! # Usage
//!
//! Start the ingest service:
//! ```bash
//! sensor-relay serve --port 8000
//! ```
//!
//! Watch a running service and export the session on Ctrl-C:
//! ```bash
//! sensor-relay watch --url 192.168.1.20:8000 --export activity_data.csv
//! ```
//!
//! Both in one process:
//! ```bash
//! sensor-relay run --export activity_data.csv
//! ```

#[cfg(not(test))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sensor_relay::app;
use sensor_relay::core::{logging, RelayConfig};
use sensor_relay::server::IngestStore;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "sensor-relay")]
#[command(about = "Relay phone motion and audio telemetry to a live viewer", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, default_value = "config/relay.toml")]
    config: PathBuf,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ingest service
    Serve {
        /// Bind host
        #[arg(long)]
        host: Option<String>,
        /// Bind port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Poll an ingest service and keep a live window
    Watch {
        #[command(flatten)]
        watch: WatchArgs,
        /// Ingest service base URL
        #[arg(long)]
        url: Option<String>,
    },

    /// Run the ingest service and a watcher in one process
    Run {
        #[command(flatten)]
        watch: WatchArgs,
        /// Bind port
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(clap::Args)]
struct WatchArgs {
    /// Poll interval (e.g. "100ms")
    #[arg(long, value_parser = humantime::parse_duration)]
    interval: Option<Duration>,
    /// Live window capacity per channel
    #[arg(long)]
    window: Option<usize>,
    /// Write session history to this CSV on exit
    #[arg(long)]
    export: Option<PathBuf>,
}

impl WatchArgs {
    fn apply(&self, config: &mut RelayConfig) {
        if let Some(interval) = self.interval {
            config.client.poll_interval = interval;
        }
        if let Some(window) = self.window {
            config.client.window_capacity = window;
        }
    }
}

async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received, shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = RelayConfig::load_from(&cli.config)?;
    if let Some(level) = cli.log_level.clone() {
        config.application.log_level = level;
    }

    match &cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host.clone_from(host);
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }
        Commands::Watch { watch, .. } => watch.apply(&mut config),
        Commands::Run { watch, port } => {
            watch.apply(&mut config);
            if let Some(port) = port {
                config.server.port = *port;
            }
        }
    }

    config.validate()?;
    logging::init_from_config(&config)?;
    info!(config = %cli.config.display(), "sensor-relay starting");

    match cli.command {
        Commands::Serve { .. } => {
            app::serve(&config, IngestStore::shared(), ctrl_c()).await?;
        }
        Commands::Watch { watch, url } => {
            let report =
                app::watch(&config, url.as_deref(), watch.export.as_deref(), ctrl_c()).await?;
            info!(link = report.link.label(), applied = report.stats.applied, "Watch finished");
        }
        Commands::Run { watch, .. } => {
            let report = app::run(&config, watch.export.as_deref(), ctrl_c()).await?;
            info!(link = report.link.label(), applied = report.stats.applied, "Run finished");
        }
    }

    Ok(())
}
