//! Test utilities for the controller
//!
//! Provides [`FakeWorld`], a scripted in-memory [`World`]: views with fixed
//! slots, click and command effects, an inventory, and an optional composter
//! whose view is rendered from its current levels.

use std::collections::HashMap;
use std::time::Instant;

use composter_core::{BuffState, ClickType, ResourceLevel, Slot, Vec3};

use crate::config::TravelMethod;
use crate::orchestrator::{COMPOSTER_VIEW, FUEL_SLOT, MATTER_SLOT};
use crate::world::{World, WorldSnapshot};

/// First slot index of the player inventory inside a container view
pub const INVENTORY_OFFSET: usize = 54;

/// What a scripted click or command does
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Replace the open view
    Open(String),
    /// Add items to the inventory
    Grant { item: String, count: u32 },
    /// Teleport the player
    MoveTo(Vec3),
    Nothing,
}

/// A composter with two levels that grow when items are fed
#[derive(Debug, Clone)]
pub struct FakeComposter {
    pub position: Vec3,
    pub matter: ResourceLevel,
    pub fuel: ResourceLevel,
    pub matter_per_item: u64,
    pub fuel_per_item: u64,
    /// Overrides the rendered lore of the matter slot
    pub matter_lore: Option<String>,
    /// When false the view opens without its two level slots
    pub levels_loaded: bool,
}

impl FakeComposter {
    pub fn new(position: Vec3, matter: ResourceLevel, fuel: ResourceLevel) -> Self {
        Self {
            position,
            matter,
            fuel,
            matter_per_item: 1_000,
            fuel_per_item: 10_000,
            matter_lore: None,
            levels_loaded: true,
        }
    }
}

/// Scripted world for unit and integration tests
#[derive(Debug, Clone)]
pub struct FakeWorld {
    open: Option<String>,
    views: HashMap<String, Vec<Slot>>,
    click_effects: HashMap<(String, usize, ClickType), Effect>,
    command_effects: HashMap<String, Effect>,
    inventory: Vec<(String, u32)>,
    composter: Option<FakeComposter>,

    pub player: Vec3,
    pub in_staging_area: bool,
    pub suffocating: bool,
    pub purse: u64,
    /// Destination of a path still "running"; `None` when idle
    pub stalled_path: Option<Vec3>,
    /// When false, path requests are accepted but never finish
    pub paths_complete: bool,
    /// Radius around the composter where a standing point exists
    pub standable: bool,
    /// Composter hidden from `locate_target`
    pub target_hidden: bool,

    facing: Option<Vec3>,
    commands: Vec<String>,
    clicks: Vec<(usize, ClickType)>,
    paths: Vec<(Vec3, TravelMethod)>,
    interactions: usize,
    stop_movement_calls: usize,
    closed_views: usize,
}

impl Default for FakeWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeWorld {
    pub fn new() -> Self {
        Self {
            open: None,
            views: HashMap::new(),
            click_effects: HashMap::new(),
            command_effects: HashMap::new(),
            inventory: Vec::new(),
            composter: None,
            player: Vec3::new(0.5, 70.0, 0.5),
            in_staging_area: false,
            suffocating: false,
            purse: 10_000_000,
            stalled_path: None,
            paths_complete: true,
            standable: true,
            target_hidden: false,
            facing: None,
            commands: Vec::new(),
            clicks: Vec::new(),
            paths: Vec::new(),
            interactions: 0,
            stop_movement_calls: 0,
            closed_views: 0,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Builders
    // ─────────────────────────────────────────────────────────────

    /// Register a view and open it
    pub fn with_view(mut self, name: &str, slots: Vec<Slot>) -> Self {
        self.views.insert(name.to_string(), slots);
        self.open = Some(name.to_string());
        self
    }

    /// Register a view without opening it
    pub fn define_view(mut self, name: &str, slots: Vec<Slot>) -> Self {
        self.views.insert(name.to_string(), slots);
        self
    }

    pub fn on_click(mut self, view: &str, index: usize, click: ClickType, effect: Effect) -> Self {
        self.click_effects
            .insert((view.to_string(), index, click), effect);
        self
    }

    pub fn on_command(mut self, command: &str, effect: Effect) -> Self {
        self.command_effects.insert(command.to_string(), effect);
        self
    }

    pub fn with_item(mut self, name: &str, count: u32) -> Self {
        self.grant(name, count);
        self
    }

    pub fn with_composter(mut self, composter: FakeComposter) -> Self {
        self.composter = Some(composter);
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.player = position;
        self
    }

    /// Desk, SkyMart and Farming Essentials with Biofuel and Box of Seeds
    pub fn with_skymart(self) -> Self {
        self.on_command("/desk", Effect::Open("Desk".into()))
            .define_view("Desk", vec![Slot::new(13, "SkyMart", 1)])
            .on_click("Desk", 13, ClickType::Left, Effect::Open("SkyMart".into()))
            .define_view("SkyMart", vec![Slot::new(20, "Diamond Hoe", 1)])
            .on_click(
                "SkyMart",
                20,
                ClickType::Left,
                Effect::Open("Farming Essentials".into()),
            )
            .define_view(
                "Farming Essentials",
                vec![Slot::new(10, "Biofuel", 1), Slot::new(11, "Box of Seeds", 1)],
            )
            .on_click(
                "Farming Essentials",
                10,
                ClickType::Right,
                Effect::Open("Biofuel Purchase".into()),
            )
            .on_click(
                "Farming Essentials",
                10,
                ClickType::QuickMove,
                Effect::Grant {
                    item: "Biofuel".into(),
                    count: 1,
                },
            )
            .on_click(
                "Farming Essentials",
                11,
                ClickType::QuickMove,
                Effect::Grant {
                    item: "Box of Seeds".into(),
                    count: 1,
                },
            )
            .define_view(
                "Biofuel Purchase",
                vec![
                    Slot::new(11, "Biofuel", 1),
                    Slot::new(13, "Biofuel", 5),
                    Slot::new(15, "Biofuel", 64),
                ],
            )
            .on_click(
                "Biofuel Purchase",
                11,
                ClickType::Left,
                Effect::Grant {
                    item: "Biofuel".into(),
                    count: 1,
                },
            )
            .on_click(
                "Biofuel Purchase",
                13,
                ClickType::Left,
                Effect::Grant {
                    item: "Biofuel".into(),
                    count: 5,
                },
            )
            .on_click(
                "Biofuel Purchase",
                15,
                ClickType::Left,
                Effect::Grant {
                    item: "Biofuel".into(),
                    count: 64,
                },
            )
    }

    /// Remove a named slot from a registered view
    pub fn without_slot(mut self, view: &str, name: &str) -> Self {
        if let Some(slots) = self.views.get_mut(view) {
            slots.retain(|slot| slot.name != name);
        }
        self
    }

    // ─────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn clicks(&self) -> &[(usize, ClickType)] {
        &self.clicks
    }

    pub fn paths(&self) -> &[(Vec3, TravelMethod)] {
        &self.paths
    }

    pub fn interactions(&self) -> usize {
        self.interactions
    }

    pub fn stopped_movement(&self) -> usize {
        self.stop_movement_calls
    }

    pub fn closed_views(&self) -> usize {
        self.closed_views
    }

    pub fn composter(&self) -> Option<&FakeComposter> {
        self.composter.as_ref()
    }

    pub fn composter_mut(&mut self) -> Option<&mut FakeComposter> {
        self.composter.as_mut()
    }

    pub fn open(&mut self, view: &str) {
        self.open = Some(view.to_string());
    }

    /// Snapshot consistent with this world: in the garden, everything known
    pub fn snapshot(&self, now: Instant) -> WorldSnapshot {
        WorldSnapshot {
            now,
            player_position: Some(self.player),
            in_garden: true,
            in_staging_area: self.in_staging_area,
            suffocating: self.suffocating,
            server_closing_secs: None,
            cookie_buff: BuffState::Active,
            contest_active: false,
            purse: Some(self.purse),
            organic_matter: self.composter.as_ref().map(|c| c.matter.current),
            fuel: self.composter.as_ref().map(|c| c.fuel.current),
            other_automation_active: false,
            auxiliary_sell_running: false,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────

    fn grant(&mut self, name: &str, count: u32) {
        match self.inventory.iter_mut().find(|(item, _)| item == name) {
            Some((_, held)) => *held += count,
            None => self.inventory.push((name.to_string(), count)),
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Open(view) => self.open = Some(view),
            Effect::Grant { item, count } => self.grant(&item, count),
            Effect::MoveTo(position) => {
                self.player = position;
                self.in_staging_area = true;
            }
            Effect::Nothing => {}
        }
    }

    fn composter_open(&self) -> bool {
        self.composter.is_some() && self.open.as_deref() == Some(COMPOSTER_VIEW)
    }

    fn composter_slots(&self, composter: &FakeComposter) -> Vec<Slot> {
        let matter_lore = composter
            .matter_lore
            .clone()
            .unwrap_or_else(|| render_label(composter.matter));
        let mut slots = Vec::new();
        if composter.levels_loaded {
            slots.push(
                Slot::new(MATTER_SLOT, "Organic Matter", 1)
                    .with_lore(["§7Stored Organic Matter".to_string(), matter_lore]),
            );
            slots.push(
                Slot::new(FUEL_SLOT, "Fuel", 1)
                    .with_lore(["§7Stored Fuel".to_string(), render_label(composter.fuel)]),
            );
        }
        slots.extend(
            self.inventory
                .iter()
                .filter(|(_, count)| *count > 0)
                .enumerate()
                .map(|(i, (name, count))| Slot::new(INVENTORY_OFFSET + i, name.clone(), *count)),
        );
        slots
    }

    /// Feed one item from an inventory slot of the composter view
    fn feed(&mut self, index: usize) {
        let Some(position) = index.checked_sub(INVENTORY_OFFSET) else {
            return;
        };
        let Some((name, count)) = self
            .inventory
            .iter_mut()
            .filter(|(_, count)| *count > 0)
            .nth(position)
        else {
            return;
        };
        *count -= 1;
        let name = name.clone();

        if let Some(composter) = self.composter.as_mut() {
            if name == "Biofuel" {
                composter.fuel.current =
                    (composter.fuel.current + composter.fuel_per_item).min(composter.fuel.max);
            } else {
                composter.matter.current = (composter.matter.current + composter.matter_per_item)
                    .min(composter.matter.max);
            }
        }
    }
}

/// `current/maxk` with thousands grouping
pub fn render_label(level: ResourceLevel) -> String {
    format!("{}/{}k", group_thousands(level.current), level.max / 1_000)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl World for FakeWorld {
    fn open_view(&self) -> Option<String> {
        self.open.clone()
    }

    fn view_slots(&self) -> Vec<Slot> {
        if self.composter_open() {
            if let Some(composter) = &self.composter {
                return self.composter_slots(composter);
            }
        }
        self.open
            .as_ref()
            .and_then(|view| self.views.get(view))
            .cloned()
            .unwrap_or_default()
    }

    fn click_slot(&mut self, index: usize, click: ClickType) {
        self.clicks.push((index, click));
        if self.composter_open() {
            self.feed(index);
            return;
        }
        let Some(view) = self.open.clone() else {
            return;
        };
        if let Some(effect) = self.click_effects.get(&(view, index, click)).cloned() {
            self.apply(effect);
        }
    }

    fn close_view(&mut self) {
        if self.open.take().is_some() {
            self.closed_views += 1;
        }
    }

    fn item_count(&self, name: &str) -> u32 {
        self.inventory
            .iter()
            .filter(|(item, _)| item == name)
            .map(|(_, count)| *count)
            .sum()
    }

    fn send_command(&mut self, command: &str) {
        self.commands.push(command.to_string());
        if let Some(effect) = self.command_effects.get(command).cloned() {
            self.apply(effect);
        }
    }

    fn locate_target(&self) -> Option<Vec3> {
        if self.target_hidden {
            return None;
        }
        self.composter.as_ref().map(|composter| composter.position)
    }

    fn closest_standable(&self, around: Vec3, radius: f64) -> Option<Vec3> {
        if !self.standable {
            return None;
        }
        Some(Vec3::new(around.x + radius.min(1.0), around.y, around.z))
    }

    fn is_target_in_crosshair(&self) -> bool {
        match (self.facing, self.locate_target()) {
            (Some(facing), Some(target)) => {
                facing == target && self.player.distance(target) <= 3.0
            }
            _ => false,
        }
    }

    fn face(&mut self, point: Vec3) {
        self.facing = Some(point);
    }

    fn is_rotating(&self) -> bool {
        false
    }

    fn step_toward(&mut self, point: Vec3) {
        let dx = point.x - self.player.x;
        let dz = point.z - self.player.z;
        self.player = Vec3::new(
            self.player.x + dx * 0.5,
            self.player.y,
            self.player.z + dz * 0.5,
        );
    }

    fn interact(&mut self) {
        self.interactions += 1;
        if self.is_target_in_crosshair() {
            self.open = Some(COMPOSTER_VIEW.to_string());
        }
    }

    fn path_to(&mut self, destination: Vec3, method: TravelMethod) {
        self.paths.push((destination, method));
        if self.paths_complete {
            self.player = destination;
        } else {
            self.stalled_path = Some(destination);
        }
    }

    fn is_pathing(&self) -> bool {
        self.stalled_path.is_some()
    }

    fn stop_movement(&mut self) {
        self.stop_movement_calls += 1;
        self.stalled_path = None;
    }
}
