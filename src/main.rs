//! hopperline - headless driver for the container-transfer engine
//!
//! Builds a small hopper layout, ticks it and optionally saves the result.

mod config;
mod headless;

use anyhow::Result;
use clap::Parser;
use config::SimConfig;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a hopper layout headless", long_about = None)]
struct Args {
    /// TOML config file (defaults to config/hopperline.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of ticks to simulate
    #[arg(long)]
    ticks: Option<u64>,
    /// Directory to save the final layout into
    #[arg(long)]
    save_dir: Option<PathBuf>,
    /// Write a JSONL event log of transfer ticks
    #[arg(long)]
    events: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize tracing with WARN level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    info!("Starting hopperline v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => SimConfig::load_from_path(path),
        None => SimConfig::load(),
    };
    if let Some(ticks) = args.ticks {
        cfg.ticks = ticks;
    }
    if args.save_dir.is_some() {
        cfg.save_dir = args.save_dir;
    }
    if args.events.is_some() {
        cfg.events_path = args.events;
    }

    let report = headless::run(&cfg)?;
    println!(
        "ticks={} transfers={} blocked={} source_left={} delivered={}",
        report.ticks, report.transfers, report.blocked, report.source_left, report.delivered
    );
    Ok(())
}
