//! Bounded per-session retry counter.

/// Counts retries against a fixed ceiling.
///
/// Reset at session start. Once exhausted it stays exhausted until reset, so
/// a caller that checks [`try_consume`](RetryCounter::try_consume) before each
/// retry falls through to its failure path exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryCounter {
    attempts: u32,
    ceiling: u32,
}

impl RetryCounter {
    pub const fn new(ceiling: u32) -> Self {
        Self {
            attempts: 0,
            ceiling,
        }
    }

    /// Record one retry if the ceiling allows it
    pub fn try_consume(&mut self) -> bool {
        if self.attempts < self.ceiling {
            self.attempts += 1;
            true
        } else {
            false
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.ceiling
    }

    /// Start a new session, optionally with a different ceiling
    pub fn reset_with(&mut self, ceiling: u32) {
        self.attempts = 0;
        self.ceiling = ceiling;
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
