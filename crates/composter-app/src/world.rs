//! World capability consumed by the controller
//!
//! The controller never reaches into game state directly. Every tick the host
//! builds a [`WorldSnapshot`] (read-only facts for this tick) and lends a
//! `&mut dyn World` for queries and actions against the live client.

use std::time::Instant;

use composter_core::{BuffState, ClickType, Slot, Vec3};

use crate::config::TravelMethod;

/// Facts about the world for one tick
#[derive(Debug, Clone)]
pub struct WorldSnapshot {
    pub now: Instant,

    /// `None` while no world is loaded
    pub player_position: Option<Vec3>,

    pub in_garden: bool,

    /// Already standing in the composter's plot
    pub in_staging_area: bool,

    pub suffocating: bool,

    /// Seconds until a server restart, when one is announced
    pub server_closing_secs: Option<u32>,

    pub cookie_buff: BuffState,

    pub contest_active: bool,

    /// Purse in coins, when known
    pub purse: Option<u64>,

    /// Organic matter stored in the composter, from the tab list
    pub organic_matter: Option<u64>,

    /// Fuel stored in the composter, from the tab list
    pub fuel: Option<u64>,

    /// Another exclusive automation is running
    pub other_automation_active: bool,

    /// The auxiliary auto-sell routine is still running
    pub auxiliary_sell_running: bool,
}

impl WorldSnapshot {
    /// An empty snapshot: no world loaded, nothing known
    pub fn at(now: Instant) -> Self {
        Self {
            now,
            player_position: None,
            in_garden: false,
            in_staging_area: false,
            suffocating: false,
            server_closing_secs: None,
            cookie_buff: BuffState::Unknown,
            contest_active: false,
            purse: None,
            organic_matter: None,
            fuel: None,
            other_automation_active: false,
            auxiliary_sell_running: false,
        }
    }

    pub fn world_loaded(&self) -> bool {
        self.player_position.is_some()
    }
}

/// Queries and actions against the live client.
///
/// Implementations translate these calls into clicks, chat messages and
/// pathfinder requests. Every method must return immediately.
pub trait World {
    // ─────────────────────────────────────────────────────────────
    // Views
    // ─────────────────────────────────────────────────────────────

    /// Title of the open container, if any
    fn open_view(&self) -> Option<String>;

    /// Every non-empty slot of the open container, player inventory included
    fn view_slots(&self) -> Vec<Slot>;

    /// First slot whose name contains `name`
    fn find_slot(&self, name: &str) -> Option<Slot> {
        self.view_slots()
            .into_iter()
            .find(|slot| slot.name.contains(name))
    }

    /// Slot at a fixed container index
    fn slot(&self, index: usize) -> Option<Slot> {
        self.view_slots()
            .into_iter()
            .find(|slot| slot.index == index)
    }

    fn click_slot(&mut self, index: usize, click: ClickType);

    fn close_view(&mut self);

    // ─────────────────────────────────────────────────────────────
    // Inventory and chat
    // ─────────────────────────────────────────────────────────────

    /// Total count of items named `name` across the player's inventory
    fn item_count(&self, name: &str) -> u32;

    fn send_command(&mut self, command: &str);

    // ─────────────────────────────────────────────────────────────
    // Target and movement
    // ─────────────────────────────────────────────────────────────

    /// Position of the composter entity if it is loaded
    fn locate_target(&self) -> Option<Vec3>;

    /// Closest standable point within `radius` of `around`
    fn closest_standable(&self, around: Vec3, radius: f64) -> Option<Vec3>;

    fn is_target_in_crosshair(&self) -> bool;

    /// Start rotating towards `point`
    fn face(&mut self, point: Vec3);

    fn is_rotating(&self) -> bool;

    /// Nudge forward towards `point`
    fn step_toward(&mut self, point: Vec3);

    /// Interact with whatever is under the crosshair
    fn interact(&mut self);

    fn path_to(&mut self, destination: Vec3, method: TravelMethod);

    fn is_pathing(&self) -> bool;

    /// Release movement keys and cancel pathing
    fn stop_movement(&mut self);
}

/// First slot matching any of `names`, tried in order.
///
/// Alternate names are only consulted once the earlier ones are absent.
pub fn find_any<S: AsRef<str>>(world: &dyn World, names: &[S]) -> Option<Slot> {
    names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !name.is_empty())
        .find_map(|name| world.find_slot(name))
}
