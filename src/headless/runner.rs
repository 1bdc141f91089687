//! Headless mode runner - paced tick loop with signal handling

use std::path::PathBuf;
use std::time::Duration;

use composter_app::config::load_settings;
use composter_core::prelude::*;

use super::{HeadlessEvent, Simulation, SimulationSummary};
use crate::sim::SimWorld;

/// Options for a headless simulation
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory holding `.composter/config.toml`
    pub project_path: PathBuf,
    /// Virtual time per tick
    pub tick_ms: u64,
    /// Stop after this many ticks
    pub max_ticks: Option<u64>,
    /// Start a manual run right away instead of waiting for the background loop
    pub manual: bool,
    /// Seed for pacing and the simulated garden
    pub seed: u64,
    /// Turn the controller on even when the config has it off
    pub force_enable: bool,
    /// Sleep between ticks; otherwise run as fast as possible
    pub realtime: bool,
}

/// Run a simulation until it settles, hits the tick limit or is interrupted
pub async fn run_headless(options: RunOptions) -> Result<SimulationSummary> {
    info!("═══════════════════════════════════════════════════════");
    info!("Composter starting in HEADLESS mode");
    info!("Project: {}", options.project_path.display());
    info!("═══════════════════════════════════════════════════════");

    let settings = load_settings(&options.project_path);
    let world = SimWorld::new(options.seed);
    let mut sim = Simulation::new(settings, world, options.seed, options.tick_ms);
    if options.force_enable {
        sim.controller_mut().set_toggled(true);
    }

    emit_all(sim.begin(options.manual));

    let period = if options.realtime {
        Duration::from_millis(options.tick_ms.max(1))
    } else {
        Duration::from_millis(1)
    };
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let reason = loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                emit_all(sim.shutdown());
                break "interrupted";
            }
            _ = interval.tick() => {
                emit_all(sim.step());

                if sim.is_settled() {
                    break "settled";
                }
                if options.max_ticks.is_some_and(|limit| sim.ticks() >= limit) {
                    emit_all(sim.shutdown());
                    break "tick limit";
                }
            }
        }
    };

    let summary = sim.summary();
    info!("Simulation finished ({}): {:?}", reason, summary);
    HeadlessEvent::finished(reason, summary.clone()).emit();
    Ok(summary)
}

fn emit_all(events: Vec<HeadlessEvent>) {
    for event in events {
        event.emit();
    }
}

/// Resolves once a termination signal arrives; pends forever if none can be installed
async fn shutdown_signal() {
    if let Err(e) = wait_for_signal().await {
        error!("Signal handler error: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Wait for a termination signal
async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| Error::host(format!("Failed to create SIGINT handler: {}", e)))?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| Error::host(format!("Failed to create SIGTERM handler: {}", e)))?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }

        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| Error::host(format!("Failed to listen for Ctrl+C: {}", e)))?;
        info!("Received Ctrl+C");
        Ok(())
    }
}
