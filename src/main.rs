//! Composter - tick-driven garden composter automation
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;

use composter::{run_headless, RunOptions};

/// Composter - runs the composter controller against a simulated garden
#[derive(Parser, Debug)]
#[command(name = "composter")]
#[command(about = "Tick-driven garden composter automation (headless simulation)", long_about = None)]
struct Args {
    /// Directory containing .composter/config.toml
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Virtual milliseconds per tick
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Start a manual run immediately instead of waiting for the background loop
    #[arg(long)]
    manual: bool,

    /// Seed for delays and the simulated garden
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Enable the controller even if the config has it disabled
    #[arg(long)]
    enable: bool,

    /// Pace ticks in wall-clock time
    #[arg(long)]
    realtime: bool,

    /// Write a commented default config to PATH and exit
    #[arg(long)]
    init: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let project_path = args
        .path
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if args.init {
        composter_app::config::init_config_dir(&project_path)?;
        eprintln!(
            "Wrote default config to {}",
            project_path.join(".composter").display()
        );
        return Ok(());
    }

    if let Err(e) = composter_core::logging::init() {
        if !e.is_recoverable() {
            return Err(e.into());
        }
        eprintln!("Continuing without file logging: {}", e);
    }

    let summary = run_headless(RunOptions {
        project_path,
        tick_ms: args.tick_ms,
        max_ticks: args.ticks,
        manual: args.manual,
        seed: args.seed,
        force_enable: args.enable,
        realtime: args.realtime,
    })
    .await?;

    if summary.restarts > 0 {
        eprintln!("Controller restarted {} time(s) after getting stuck", summary.restarts);
    }
    Ok(())
}
