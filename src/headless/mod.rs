//! Headless mode - JSON event output for simulated runs
//!
//! The controller is ticked against a [`SimWorld`](crate::sim::SimWorld) and
//! everything it reports back (notices, host requests, state changes) is
//! written to stdout as NDJSON, one event per line.
//!
//! # Example Output
//!
//! ```json
//! {"event":"run_started","trigger":"manual","tick":1,"timestamp":1704700001000}
//! {"event":"notice","severity":"success","message":"Found Composter! (-11.5, 72.0, -28.5)","webhook":false,"timestamp":1704700002000}
//! {"event":"status","tick":40,"status":{"running":true,"main":"Operate",...},"timestamp":1704700003000}
//! ```

pub mod runner;
pub mod simulation;

use chrono::Utc;
use serde::Serialize;
use std::io::{self, Write};
use tracing::error;

use composter_app::{ControllerStatus, HostAction, Trigger};
use composter_core::Severity;

pub use runner::{run_headless, RunOptions};
pub use simulation::{Simulation, SimulationSummary};

/// Events emitted in headless mode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// A run began, manually or from the background loop
    RunStarted {
        trigger: Trigger,
        tick: u64,
        timestamp: i64,
    },

    /// A chat or webhook notice
    Notice {
        severity: Severity,
        message: String,
        webhook: bool,
        timestamp: i64,
    },

    /// A request for the host (pause or resume the macro, halt movement...)
    Host {
        action: HostAction,
        tick: u64,
        timestamp: i64,
    },

    /// Phase or purchase state changed
    Status {
        tick: u64,
        status: ControllerStatus,
        timestamp: i64,
    },

    /// The simulation ended
    Finished {
        reason: String,
        summary: SimulationSummary,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn run_started(trigger: Trigger, tick: u64) -> Self {
        Self::RunStarted {
            trigger,
            tick,
            timestamp: Self::now(),
        }
    }

    /// Notices become `notice` events; every other action a `host` event
    pub fn from_action(action: HostAction, tick: u64) -> Self {
        match action {
            HostAction::Notify(notice) => Self::Notice {
                severity: notice.severity,
                message: notice.message,
                webhook: notice.webhook,
                timestamp: Self::now(),
            },
            action => Self::Host {
                action,
                tick,
                timestamp: Self::now(),
            },
        }
    }

    pub fn status(tick: u64, status: ControllerStatus) -> Self {
        Self::Status {
            tick,
            status,
            timestamp: Self::now(),
        }
    }

    pub fn finished(reason: impl Into<String>, summary: SimulationSummary) -> Self {
        Self::Finished {
            reason: reason.into(),
            summary,
            timestamp: Self::now(),
        }
    }
}
