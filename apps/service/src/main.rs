#![warn(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use httpmonitor::app;
use httpmonitor::config::Config;
use logger::{LogFormat, init_tracing_with};
use tracing::info;
use tracing::level_filters::LevelFilter;

/// Poll HTTP endpoints and report whether their checks pass
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration file (TOML, or JSON when it ends in .json).
    /// Defaults to $XDG_CONFIG_HOME/httpmonitor/config.toml
    config: Option<PathBuf>,

    /// Write results to this CSV file
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,

    /// Serve the status dashboard on this address
    #[arg(long, value_name = "ADDR")]
    http: Option<String>,

    /// Results buffered between the monitor loops and the outputs
    #[arg(long, value_name = "N")]
    channel_capacity: Option<usize>,

    /// Default log level, RUST_LOG takes precedence
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LevelFilter,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(log) = &self.log {
            config.log = Some(log.clone());
        }
        if let Some(http) = &self.http {
            config.http = Some(http.clone());
        }
        if let Some(capacity) = self.channel_capacity {
            config.channel_capacity = capacity;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing_with(cli.log_level, LogFormat::from_env());

    let mut config =
        Config::from_config(cli.config.as_ref()).context("Failed to load configuration")?;
    cli.apply(&mut config);

    info!("{config}");

    app::run(config).await?;
    Ok(())
}
