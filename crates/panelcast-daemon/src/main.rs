//! Panelcast Daemon - Main entry point
//!
//! Loads the replication programs and drives their transmit/receive cycle on
//! a fixed interval.

mod bus;
mod config;
mod registry;
mod state;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "panelcast")]
#[command(about = "Mirror text panel content between displays over tagged broadcasts")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "panelcast.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Load every node, print the replication tables as JSON and exit
    #[arg(long)]
    check: bool,

    /// Run this many cycles and exit instead of running until interrupted
    #[arg(long)]
    ticks: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Panelcast v{}", env!("CARGO_PKG_VERSION"));

    let config = config::load_config(&args.config)?;

    info!(
        surfaces = %config.daemon.surfaces_dir.display(),
        blocks = config.blocks.len(),
        nodes = config.nodes.len(),
        "Configuration loaded"
    );

    let mut state = state::AppState::new(config, &args.config)?;

    if args.check {
        println!("{}", serde_json::to_string_pretty(&state.summaries())?);
        return Ok(());
    }

    state.run(args.ticks).await?;

    Ok(())
}
