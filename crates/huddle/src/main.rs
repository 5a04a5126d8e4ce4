//! # huddle
//!
//! Chat relay server binary: loads settings, initializes logging and
//! metrics, and serves until ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use huddle_core::logging;
use huddle_server::{HuddleServer, ServerConfig};
use huddle_settings::{HuddleSettings, LogFormat};

/// huddle chat relay.
#[derive(Parser, Debug)]
#[command(name = "huddle", version, about = "Real-time chat relay over WebSocket")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long, short)]
    port: Option<u16>,

    /// Maximum concurrent connections (overrides settings).
    #[arg(long)]
    max_connections: Option<usize>,

    /// Settings file (default `~/.huddle/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `huddle_relay=trace` (overrides settings).
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings, then
    /// re-check the cross-field constraints the overrides may have broken.
    fn apply(&self, settings: &mut HuddleSettings) -> huddle_settings::Result<()> {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(max) = self.max_connections {
            settings.server.max_connections = max;
        }
        if let Some(ref level) = self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.json_logs {
            settings.logging.format = LogFormat::Json;
        }
        huddle_settings::validate(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Settings come first: they decide the log level.
    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(huddle_settings::settings_path);
    let mut settings = huddle_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    args.apply(&mut settings).context("Invalid command-line overrides")?;

    match settings.logging.format {
        LogFormat::Compact => logging::init_subscriber(&settings.logging.level),
        LogFormat::Json => logging::init_json_subscriber(&settings.logging.level),
    }

    let metrics = huddle_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let server = HuddleServer::new(ServerConfig::from(&settings.server), Some(metrics));
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("huddle listening on ws://{addr}/ws");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    let _ = server.shutdown().drain(vec![handle], None).await;
    Ok(())
}
