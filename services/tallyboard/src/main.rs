//! Tallyboard CLI
//!
//! Command-line interface for the live sorting and dispatch dashboard.

use std::path::PathBuf;

use clap::Parser;
use tallyboard::{load_config, Config};
use tracing::Level;

#[derive(Parser)]
#[command(name = "tallyboard")]
#[command(about = "Live sorting and dispatch dashboard")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Realtime database base URL (overrides config file)
    #[arg(long)]
    database_url: Option<String>,

    /// Dashboard port (overrides config file)
    #[arg(long)]
    dashboard_port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(database_url) = args.database_url {
        config.database.base_url = database_url;
    }
    if let Some(dashboard_port) = args.dashboard_port {
        config.dashboard.port = dashboard_port;
    }

    tracing::info!("Starting tallyboard service");
    tracing::debug!(
        "Database: {}, dashboard enabled: {}, port: {}",
        config.database.base_url,
        config.dashboard.enabled,
        config.dashboard.port
    );

    tallyboard::run(config).await?;

    Ok(())
}
