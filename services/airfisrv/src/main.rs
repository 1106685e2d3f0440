//! airfisrv - Airfi air handling unit sync service

use std::path::PathBuf;

use airfisrv::config::{AirfiConfig, DEFAULT_CONFIG_PATH};
use airfisrv::logging::{self, LoggingOptions};
use airfisrv::service;
use anyhow::Context;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "airfisrv",
    version = env!("CARGO_PKG_VERSION"),
    about = "Airfi air handling unit Modbus/TCP sync service"
)]
struct Args {
    /// Configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short = 'l', long)]
    log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long)]
    json: bool,

    /// Disable colored output (useful for log files)
    #[arg(long)]
    no_color: bool,

    /// Only validate configuration without starting service
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = AirfiConfig::load(Some(&args.config))
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    logging::init(&LoggingOptions {
        level: args.log_level.clone().unwrap_or_else(|| config.log.level.clone()),
        json: args.json || config.log.json,
        ansi: !args.no_color,
    })?;

    if args.validate {
        info!(
            "Configuration {} is valid: {} device(s)",
            args.config.display(),
            config.devices.len()
        );
        return Ok(());
    }

    info!("Starting airfisrv v{}", env!("CARGO_PKG_VERSION"));
    service::run(config, service::wait_for_shutdown()).await?;
    Ok(())
}
