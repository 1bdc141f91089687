//! Composter Library
//!
//! Headless host for the composter controller: a simulated garden world and
//! an NDJSON runner that ticks the orchestrator against it.

// Module declarations
pub mod headless;
pub mod sim;

// Re-export main entry points
pub use headless::{run_headless, RunOptions, Simulation, SimulationSummary};
pub use sim::SimWorld;
