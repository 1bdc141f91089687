//! Host actions emitted by the controller
//!
//! The controller never calls into the host directly. Everything the host has
//! to do on its behalf (pausing the farming macro, releasing movement keys,
//! showing a notice) is queued here and drained once per tick.

use std::collections::VecDeque;

use composter_core::Notice;
use serde::Serialize;

/// Oldest actions are dropped beyond this many undrained entries
pub const MAX_PENDING_ACTIONS: usize = 256;

/// Something the host should do after a tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "data", rename_all = "snake_case")]
pub enum HostAction {
    /// Pause the farming macro while the controller runs
    PauseMacro,

    /// Resume the farming macro after a periodic run
    ResumeMacro,

    /// Release movement keys and cancel any pathing
    HaltMovement,

    /// Start the auxiliary auto-sell routine
    StartAutoSell,

    /// Show a notice (and optionally forward it to the webhook)
    Notify(Notice),
}

/// FIFO outbox of host actions
#[derive(Debug, Default)]
pub struct ActionQueue {
    pending: VecDeque<HostAction>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: HostAction) {
        if self.pending.len() >= MAX_PENDING_ACTIONS {
            self.pending.pop_front();
        }
        self.pending.push_back(action);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every pending action in emission order
    pub fn drain(&mut self) -> Vec<HostAction> {
        self.pending.drain(..).collect()
    }

    /// Pending notices, oldest first
    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.pending.iter().filter_map(|action| match action {
            HostAction::Notify(notice) => Some(notice),
            _ => None,
        })
    }
}
