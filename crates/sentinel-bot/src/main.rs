//! Autonomous trading engine - entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Autonomous trading decision and execution engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via SENTINEL_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    sentinel_telemetry::init_logging()?;

    info!("Starting sentinel v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args
        .config
        .or_else(|| std::env::var("SENTINEL_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = sentinel_bot::EngineConfig::from_file(&config_path)?;
    info!(
        mode = ?config.mode,
        symbols = ?config.symbols,
        interval_secs = config.cycle_interval_secs,
        "Configuration loaded"
    );

    let engine = sentinel_bot::TradingEngine::paper(config)?;
    engine.run().await?;

    Ok(())
}
