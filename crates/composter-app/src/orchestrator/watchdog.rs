//! Stall watchdog
//!
//! One countdown re-armed on every phase transition. When it elapses the
//! orchestrator asks [`Watchdog::check`] what to do about it.

use std::time::Instant;

use composter_core::Timer;

/// Explicit window while walking to or searching for the target
pub const TRAVEL_WINDOW_MS: u64 = 30_000;

/// Explicit window after interacting with the target
pub const INTERACT_WINDOW_MS: u64 = 10_000;

/// What to do about the watchdog this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Not elapsed, or not armed
    Quiet,
    /// Elapsed while a purchase flow runs: give the flow more time
    Rearm,
    /// Elapsed during the end sequence: stop watching
    Disarm,
    /// Elapsed with no excuse: stop and start again
    Restart,
}

#[derive(Debug, Clone)]
pub struct Watchdog {
    timer: Timer,
    /// Default window: base stall delay plus the GUI delay and its randomness
    window_ms: u64,
}

impl Watchdog {
    pub fn new(window_ms: u64) -> Self {
        Self {
            timer: Timer::new(),
            window_ms,
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Re-arm with the default window
    pub fn arm(&mut self, now: Instant) {
        self.timer.schedule_ms(now, self.window_ms);
    }

    /// Re-arm with an explicit window
    pub fn arm_for(&mut self, now: Instant, window_ms: u64) {
        self.timer.schedule_ms(now, window_ms);
    }

    pub fn disarm(&mut self) {
        self.timer.reset();
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn check(&self, now: Instant, flow_running: bool, ending: bool) -> Verdict {
        if !self.timer.passed(now) {
            Verdict::Quiet
        } else if flow_running {
            Verdict::Rearm
        } else if ending {
            Verdict::Disarm
        } else {
            Verdict::Restart
        }
    }
}
