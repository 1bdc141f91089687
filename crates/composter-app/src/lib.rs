//! composter-app - Controller logic for the garden composter
//!
//! This crate implements the hierarchical state machine that travels to the
//! composter, buys missing supplies through the purchase flows, feeds it and
//! hands control back to the farming macro. The host supplies a [`World`]
//! implementation and a [`WorldSnapshot`] per tick; side effects meant for the
//! host (pausing the macro, chat notices) come back as [`HostAction`]s.

pub mod action;
pub mod config;
pub mod orchestrator;
pub mod pacing;
pub mod purchase;
pub mod status;
pub mod world;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

// Re-export primary types
pub use action::{ActionQueue, HostAction};
pub use config::Settings;
pub use orchestrator::{MainState, OperateState, Orchestrator, TravelState, Trigger};
pub use pacing::Pacing;
pub use purchase::{FlowKind, ItemBuyer, PurchaseFlow, PurchaseRequest, PurchaseState, ShoppingBuyer};
pub use status::ControllerStatus;
pub use world::{World, WorldSnapshot};
