//! Purchase flows
//!
//! Every flow walks the same menu path (hub command, store, category) and then
//! acquires items its own way:
//! - [`ItemBuyer::biofuel`] - right-click submenu with a batch picker
//! - [`ItemBuyer::box_of_seeds`] - quick-move purchases of one item
//! - [`ShoppingBuyer`] - a shopping list with per-item verification and retry passes
//!
//! Flows only report through [`PurchaseFlow`]; they never touch the
//! orchestrator.

pub mod engine;
pub mod multi;
pub mod single;


use std::time::Instant;

use serde::Serialize;

use crate::world::World;

pub use engine::{DebugLevel, FlowCore};
pub use multi::ShoppingBuyer;
pub use single::ItemBuyer;

pub const BIOFUEL: &str = "Biofuel";
pub const BOX_OF_SEEDS: &str = "Box of Seeds";

/// State of a purchase flow, shared by every flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PurchaseState {
    #[default]
    Idle,
    OpenHub,
    AwaitHub,
    OpenStore,
    AwaitStore,
    OpenCategory,
    AwaitCategory,
    SelectItem,
    AwaitSubmenu,
    SelectBatch,
    Confirm,
    Verify,
    Done,
    Failed,
}

impl PurchaseState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PurchaseState::Done | PurchaseState::Failed)
    }

    /// States that only walk the shared menu path
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            PurchaseState::OpenHub
                | PurchaseState::AwaitHub
                | PurchaseState::OpenStore
                | PurchaseState::AwaitStore
                | PurchaseState::OpenCategory
                | PurchaseState::AwaitCategory
        )
    }
}

impl std::fmt::Display for PurchaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One line of a shopping list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRequest {
    pub item: String,
    pub quantity: u32,
}

impl PurchaseRequest {
    pub fn new(item: impl Into<String>, quantity: u32) -> Self {
        Self {
            item: item.into(),
            quantity,
        }
    }
}

/// Requested versus obtained for one item of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResult {
    pub item: String,
    pub requested: u32,
    pub obtained: u32,
}

impl ItemResult {
    pub fn shortfall(&self) -> u32 {
        self.requested.saturating_sub(self.obtained)
    }

    pub fn is_satisfied(&self) -> bool {
        self.obtained >= self.requested
    }
}

/// Which flow the orchestrator delegated to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FlowKind {
    /// Biofuel batch purchase (fuel)
    Fuel,
    /// Box of Seeds quick-buy (organic matter)
    Matter,
    /// Both at once through the shopping list
    Shopping,
}

impl std::fmt::Display for FlowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowKind::Fuel => write!(f, "Biofuel"),
            FlowKind::Matter => write!(f, "Box of Seeds"),
            FlowKind::Shopping => write!(f, "Shopping"),
        }
    }
}

/// Public contract of every purchase flow
pub trait PurchaseFlow {
    /// Begin a session. Returns false (and changes nothing) while a session
    /// is already running or when there is nothing to buy. Requests for items
    /// the flow does not sell are ignored.
    fn start_session(&mut self, requests: &[PurchaseRequest], world: &dyn World) -> bool;

    /// Advance at most one step. Returns true exactly on the tick the flow
    /// reaches Done or Failed; the flow has stopped by the time it returns.
    fn tick(&mut self, now: Instant, world: &mut dyn World) -> bool;

    /// Force the flow back to Idle. Idempotent.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Not running and every requested quantity was met
    fn has_succeeded(&self) -> bool;

    fn has_failed(&self) -> bool;

    fn state(&self) -> PurchaseState;

    /// Requested versus obtained for the current or last session
    fn results(&self) -> Vec<ItemResult>;
}
