//! Schedulable countdown used for pacing, timeouts and stall detection.
//!
//! The timer never reads the system clock itself; callers pass `now` in.
//! That keeps every state machine built on top of it a pure function of
//! its inputs, which is what makes the tick loop testable.

use std::time::{Duration, Instant};

/// A one-shot countdown.
///
/// Once armed, the timer stays armed after its deadline passes until it is
/// re-scheduled or [`reset`](Timer::reset).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    deadline: Option<Instant>,
    duration: Duration,
}

impl Timer {
    pub const fn new() -> Self {
        Self {
            deadline: None,
            duration: Duration::ZERO,
        }
    }

    /// Arm the timer with a deadline of `now + duration`
    ///
    /// A duration past what `Instant` can represent saturates to the
    /// farthest reachable deadline.
    pub fn schedule(&mut self, now: Instant, duration: Duration) {
        self.deadline = Some(deadline_after(now, duration));
        self.duration = duration;
    }

    /// Arm the timer for `ms` milliseconds
    pub fn schedule_ms(&mut self, now: Instant, ms: u64) {
        self.schedule(now, Duration::from_millis(ms));
    }

    /// True iff the timer is armed and its deadline has been reached
    pub fn passed(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// True while the timer is armed (whether or not it already passed)
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// True while armed and the deadline is still ahead
    pub fn is_pending(&self, now: Instant) -> bool {
        self.is_armed() && !self.passed(now)
    }

    /// Time left until the deadline; zero when passed or disarmed
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Duration of the most recent schedule
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Disarm the timer
    pub fn reset(&mut self) {
        self.deadline = None;
    }
}

/// `now + duration`, clamped to the latest representable instant
fn deadline_after(now: Instant, duration: Duration) -> Instant {
    if let Some(deadline) = now.checked_add(duration) {
        return deadline;
    }
    let mut deadline = now;
    let mut step = duration;
    while !step.is_zero() {
        match deadline.checked_add(step) {
            Some(next) => deadline = next,
            None => step /= 2,
        }
    }
    deadline
}
