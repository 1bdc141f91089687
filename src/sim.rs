//! Simulated garden - an in-memory world for headless runs
//!
//! Models just enough of the garden for the controller to do a full run: a
//! composter whose levels drain over time, a player that flies or walks along
//! straight paths, the desk and SkyMart menus, and a coin purse.

use std::collections::BTreeMap;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use composter_app::config::TravelMethod;
use composter_app::orchestrator::{COMPOSTER_VIEW, FUEL_SLOT, MATTER_SLOT};
use composter_app::purchase::{BIOFUEL, BOX_OF_SEEDS};
use composter_app::{World, WorldSnapshot};
use composter_core::prelude::*;
use composter_core::{BuffState, ClickType, ResourceLevel, Slot, Vec3};

/// Where the composter stands
pub const COMPOSTER_AT: Vec3 = Vec3::new(-11.5, 72.0, -28.5);

/// Where the teleport command lands
pub const BARN: Vec3 = Vec3::new(-4.5, 72.0, -24.5);

/// Spawn point, out in the fields
pub const FIELDS: Vec3 = Vec3::new(120.5, 70.0, 64.5);

/// First inventory slot index inside a container view
const INVENTORY_OFFSET: usize = 54;

/// The composter entity is only visible within this range
const RENDER_DISTANCE: f64 = 48.0;

/// Standing inside this radius of the composter counts as the staging area
const STAGING_RADIUS: f64 = 16.0;

const FLY_SPEED: f64 = 11.0;
const WALK_SPEED: f64 = 4.3;

const TELEPORT_COMMAND: &str = "/tptoplot barn";
const HUB_COMMAND: &str = "/desk";

const DESK: &str = "Desk";
const SKYMART: &str = "SkyMart";
const FARMING_ESSENTIALS: &str = "Farming Essentials";
const BIOFUEL_PURCHASE: &str = "Biofuel Purchase";

/// Coins per item
const BIOFUEL_PRICE: u64 = 20_000;
const BOX_OF_SEEDS_PRICE: u64 = 4_000;

const MATTER_PER_CROP: u64 = 1_600;
const MATTER_PER_BOX: u64 = 25_600;
const FUEL_PER_BIOFUEL: u64 = 3_000;

/// Consumption per second while the composter works
const MATTER_DRAIN: f64 = 4.0;
const FUEL_DRAIN: f64 = 2.0;

#[derive(Debug, Clone)]
struct Path {
    destination: Vec3,
    speed: f64,
}

#[derive(Debug)]
pub struct SimWorld {
    rng: StdRng,
    last_advance: Option<Instant>,

    player: Vec3,
    path: Option<Path>,
    facing: Option<Vec3>,
    open: Option<String>,
    inventory: BTreeMap<String, u32>,
    purse: u64,

    matter: ResourceLevel,
    fuel: ResourceLevel,
    drained: (f64, f64),

    commands: Vec<String>,
}

impl SimWorld {
    /// A garden with drained levels and a random handful of crops
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let matter = ResourceLevel::new(rng.gen_range(2_000..15_000), 40_000);
        let fuel = ResourceLevel::new(rng.gen_range(4_000..18_000), 100_000);

        let mut inventory = BTreeMap::new();
        inventory.insert("Enchanted Wheat".to_string(), rng.gen_range(2..10));
        inventory.insert("Enchanted Potato".to_string(), rng.gen_range(0..6));

        Self {
            rng,
            last_advance: None,
            player: FIELDS,
            path: None,
            facing: None,
            open: None,
            inventory,
            purse: 5_000_000,
            matter,
            fuel,
            drained: (0.0, 0.0),
            commands: Vec::new(),
        }
    }

    pub fn with_levels(mut self, matter: u64, fuel: u64) -> Self {
        self.matter.current = matter.min(self.matter.max);
        self.fuel.current = fuel.min(self.fuel.max);
        self
    }

    pub fn with_item(mut self, name: &str, count: u32) -> Self {
        self.grant(name, count);
        self
    }

    pub fn with_purse(mut self, purse: u64) -> Self {
        self.purse = purse;
        self
    }

    pub fn matter(&self) -> ResourceLevel {
        self.matter
    }

    pub fn fuel(&self) -> ResourceLevel {
        self.fuel
    }

    pub fn purse(&self) -> u64 {
        self.purse
    }

    pub fn player(&self) -> Vec3 {
        self.player
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Move the player along its path and drain the composter
    pub fn advance(&mut self, now: Instant) {
        let elapsed = self
            .last_advance
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_advance = Some(now);
        if elapsed <= 0.0 {
            return;
        }

        if let Some(path) = &self.path {
            let step = path.speed * elapsed;
            let remaining = self.player.distance(path.destination);
            if remaining <= step {
                self.player = path.destination;
                self.path = None;
            } else {
                let ratio = step / remaining;
                let d = path.destination;
                self.player = Vec3::new(
                    self.player.x + (d.x - self.player.x) * ratio,
                    self.player.y + (d.y - self.player.y) * ratio,
                    self.player.z + (d.z - self.player.z) * ratio,
                );
            }
        }

        // Both drain together; a composter without one of them idles
        if self.matter.current > 0 && self.fuel.current > 0 {
            self.drained.0 += MATTER_DRAIN * elapsed;
            self.drained.1 += FUEL_DRAIN * elapsed;
            let matter = self.drained.0.floor();
            let fuel = self.drained.1.floor();
            self.drained.0 -= matter;
            self.drained.1 -= fuel;
            self.matter.current = self.matter.current.saturating_sub(matter as u64);
            self.fuel.current = self.fuel.current.saturating_sub(fuel as u64);
        }
    }

    /// Facts for this tick, as a client-side scraper would report them
    pub fn snapshot(&self, now: Instant) -> WorldSnapshot {
        WorldSnapshot {
            now,
            player_position: Some(self.player),
            in_garden: true,
            in_staging_area: self.player.distance(COMPOSTER_AT) <= STAGING_RADIUS,
            suffocating: false,
            server_closing_secs: None,
            cookie_buff: BuffState::Active,
            contest_active: false,
            purse: Some(self.purse),
            organic_matter: Some(self.matter.current),
            fuel: Some(self.fuel.current),
            other_automation_active: false,
            auxiliary_sell_running: false,
        }
    }

    fn grant(&mut self, name: &str, count: u32) {
        *self.inventory.entry(name.to_string()).or_insert(0) += count;
    }

    fn take(&mut self, name: &str) -> bool {
        match self.inventory.get_mut(name) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Buy `count` items if the purse allows it
    fn buy(&mut self, name: &str, count: u32, price: u64) {
        let cost = price * u64::from(count);
        if self.purse < cost {
            warn!("[Sim] Not enough coins for {}x {}", count, name);
            return;
        }
        self.purse -= cost;
        self.grant(name, count);
        debug!("[Sim] Bought {}x {} for {} coins", count, name, cost);
    }

    fn inventory_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.inventory
            .iter()
            .filter(|(_, count)| **count > 0)
            .enumerate()
            .map(|(i, (name, count))| Slot::new(INVENTORY_OFFSET + i, name.clone(), *count))
    }

    fn container_slots(&self, view: &str) -> Vec<Slot> {
        match view {
            COMPOSTER_VIEW => vec![
                Slot::new(MATTER_SLOT, "Organic Matter", 1)
                    .with_lore(["§7Stored Organic Matter".to_string(), label(self.matter)]),
                Slot::new(FUEL_SLOT, "Fuel", 1)
                    .with_lore(["§7Stored Fuel".to_string(), label(self.fuel)]),
            ],
            DESK => vec![Slot::new(13, "SkyMart", 1)],
            SKYMART => vec![Slot::new(20, "Diamond Hoe", 1)],
            FARMING_ESSENTIALS => vec![
                Slot::new(10, BIOFUEL, 1),
                Slot::new(11, BOX_OF_SEEDS, 1),
            ],
            BIOFUEL_PURCHASE => vec![
                Slot::new(11, BIOFUEL, 1),
                Slot::new(13, BIOFUEL, 5),
                Slot::new(15, BIOFUEL, 32),
            ],
            _ => Vec::new(),
        }
    }

    /// Feed the item in an inventory slot of the composter view
    fn feed(&mut self, index: usize) {
        let Some(slot) = self.inventory_slots().find(|slot| slot.index == index) else {
            return;
        };
        if !self.take(&slot.name) {
            return;
        }

        match slot.name.as_str() {
            BIOFUEL => self.fuel.current = (self.fuel.current + FUEL_PER_BIOFUEL).min(self.fuel.max),
            BOX_OF_SEEDS => {
                self.matter.current = (self.matter.current + MATTER_PER_BOX).min(self.matter.max)
            }
            _ => {
                self.matter.current = (self.matter.current + MATTER_PER_CROP).min(self.matter.max)
            }
        }
    }
}

/// `current/maxk` as shown in the composter tooltip
fn label(level: ResourceLevel) -> String {
    let digits = level.current.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}/{}k", grouped, level.max / 1_000)
}

impl World for SimWorld {
    fn open_view(&self) -> Option<String> {
        self.open.clone()
    }

    fn view_slots(&self) -> Vec<Slot> {
        let Some(view) = self.open.as_deref() else {
            return Vec::new();
        };
        let mut slots = self.container_slots(view);
        slots.extend(self.inventory_slots());
        slots
    }

    fn click_slot(&mut self, index: usize, click: ClickType) {
        let Some(view) = self.open.clone() else {
            return;
        };
        trace!("[Sim] Click {} ({:?}) in {}", index, click, view);

        match (view.as_str(), index, click) {
            (COMPOSTER_VIEW, _, ClickType::Left) => self.feed(index),
            (DESK, 13, ClickType::Left) => self.open = Some(SKYMART.to_string()),
            (SKYMART, 20, ClickType::Left) => self.open = Some(FARMING_ESSENTIALS.to_string()),
            (FARMING_ESSENTIALS, 10, ClickType::Right) => {
                self.open = Some(BIOFUEL_PURCHASE.to_string())
            }
            (FARMING_ESSENTIALS, 10, ClickType::QuickMove) => self.buy(BIOFUEL, 1, BIOFUEL_PRICE),
            (FARMING_ESSENTIALS, 11, ClickType::QuickMove) => {
                self.buy(BOX_OF_SEEDS, 1, BOX_OF_SEEDS_PRICE)
            }
            (BIOFUEL_PURCHASE, 11, ClickType::Left) => self.buy(BIOFUEL, 1, BIOFUEL_PRICE),
            (BIOFUEL_PURCHASE, 13, ClickType::Left) => self.buy(BIOFUEL, 5, BIOFUEL_PRICE),
            (BIOFUEL_PURCHASE, 15, ClickType::Left) => self.buy(BIOFUEL, 32, BIOFUEL_PRICE),
            _ => {}
        }
    }

    fn close_view(&mut self) {
        self.open = None;
    }

    fn item_count(&self, name: &str) -> u32 {
        self.inventory.get(name).copied().unwrap_or(0)
    }

    fn send_command(&mut self, command: &str) {
        debug!("[Sim] Command: {}", command);
        self.commands.push(command.to_string());
        match command {
            TELEPORT_COMMAND => {
                self.open = None;
                self.path = None;
                self.player = BARN;
            }
            HUB_COMMAND => self.open = Some(DESK.to_string()),
            _ => {}
        }
    }

    fn locate_target(&self) -> Option<Vec3> {
        (self.player.distance(COMPOSTER_AT) <= RENDER_DISTANCE).then_some(COMPOSTER_AT)
    }

    fn closest_standable(&self, around: Vec3, radius: f64) -> Option<Vec3> {
        // The composter sits against a wall on its west side
        let candidates = [
            Vec3::new(around.x + 1.0, around.y, around.z),
            Vec3::new(around.x, around.y, around.z + 1.0),
            Vec3::new(around.x, around.y, around.z - 1.0),
        ];
        candidates
            .into_iter()
            .filter(|point| point.distance(around) <= radius)
            .min_by(|a, b| {
                a.distance_sq(self.player)
                    .total_cmp(&b.distance_sq(self.player))
            })
    }

    fn is_target_in_crosshair(&self) -> bool {
        self.facing == Some(COMPOSTER_AT) && self.player.distance(COMPOSTER_AT) <= 4.0
    }

    fn face(&mut self, point: Vec3) {
        self.facing = Some(point);
    }

    fn is_rotating(&self) -> bool {
        false
    }

    fn step_toward(&mut self, point: Vec3) {
        let distance = self.player.distance(point);
        if distance <= f64::EPSILON {
            return;
        }
        let ratio = (0.5 / distance).min(1.0);
        self.player = Vec3::new(
            self.player.x + (point.x - self.player.x) * ratio,
            self.player.y,
            self.player.z + (point.z - self.player.z) * ratio,
        );
    }

    fn interact(&mut self) {
        if self.is_target_in_crosshair() {
            self.open = Some(COMPOSTER_VIEW.to_string());
        }
    }

    fn path_to(&mut self, destination: Vec3, method: TravelMethod) {
        let speed = match method {
            TravelMethod::Fly => FLY_SPEED,
            TravelMethod::Walk => WALK_SPEED,
        };
        // A little wobble so no two runs take the same time
        let speed = speed * self.rng.gen_range(0.9..1.1);
        self.path = Some(Path { destination, speed });
    }

    fn is_pathing(&self) -> bool {
        self.path.is_some()
    }

    fn stop_movement(&mut self) {
        self.path = None;
    }
}
