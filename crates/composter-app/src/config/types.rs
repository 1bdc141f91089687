//! Configuration types for the composter controller
//!
//! Defines:
//! - `Settings` - Root of `.composter/config.toml`
//! - `ComposterSettings` - Thresholds, travel, feeding and commands
//! - `PurchaseSettings` - Menu path and one section per purchase flow
//! - Related enums (`TravelMethod`, `OrganicMatter`, `ViewMatcher`)

use serde::{Deserialize, Serialize};

/// Application settings (.composter/config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub composter: ComposterSettings,

    #[serde(default)]
    pub gui: GuiSettings,

    #[serde(default)]
    pub background_loop: BackgroundLoopSettings,

    #[serde(default)]
    pub purchase: PurchaseSettings,
}

// ─────────────────────────────────────────────────────────────────────────────
// Composter
// ─────────────────────────────────────────────────────────────────────────────

/// Main controller settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComposterSettings {
    /// Feature toggle; a run never starts while off
    #[serde(default)]
    pub enabled: bool,

    /// Fill organic matter up to this amount (and start a run below it)
    #[serde(default = "default_left_threshold")]
    pub organic_matter_left: i64,

    /// Fill fuel up to this amount (and start a run below it)
    #[serde(default = "default_left_threshold")]
    pub fuel_left: i64,

    /// Minimum purse in thousands of coins for periodic runs
    #[serde(default = "default_min_purse_k")]
    pub min_purse_k: u64,

    #[serde(default)]
    pub require_cookie_buff: bool,

    /// Skip periodic runs while a farming contest is active
    #[serde(default = "default_true")]
    pub pause_during_contest: bool,

    #[serde(default)]
    pub travel_method: TravelMethod,

    /// Run the auto-sell routine before filling
    #[serde(default)]
    pub auto_sell_before_filling: bool,

    /// Known standing position next to the composter
    #[serde(default)]
    pub target_position: Option<[i32; 3]>,

    /// Where to walk while searching for the composter
    #[serde(default = "default_search_origin")]
    pub search_origin: [i32; 3],

    /// Delay after each organic matter click
    #[serde(default = "default_click_delay_ms")]
    pub click_delay_ms: u64,

    /// Delay after each fuel click
    #[serde(default = "default_click_delay_ms")]
    pub fuel_click_delay_ms: u64,

    /// Organic matter items the controller may feed
    #[serde(default = "default_organic_matter")]
    pub organic_matter: Vec<OrganicMatter>,

    /// Pipe-delimited priority, e.g. `"enchanted_wheat|Enchanted Carrot"`
    #[serde(default)]
    pub organic_priority: String,

    /// Feed Box of Seeds when no enabled organic matter is on hand
    #[serde(default)]
    pub use_box_of_seeds: bool,

    /// Forward session start/end notices to the webhook
    #[serde(default)]
    pub log_events: bool,

    /// How "which menu is open" is decided
    #[serde(default)]
    pub view_matching: ViewMatcher,

    #[serde(default)]
    pub commands: CommandSettings,
}

impl Default for ComposterSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            organic_matter_left: default_left_threshold(),
            fuel_left: default_left_threshold(),
            min_purse_k: default_min_purse_k(),
            require_cookie_buff: false,
            pause_during_contest: true,
            travel_method: TravelMethod::default(),
            auto_sell_before_filling: false,
            target_position: None,
            search_origin: default_search_origin(),
            click_delay_ms: default_click_delay_ms(),
            fuel_click_delay_ms: default_click_delay_ms(),
            organic_matter: default_organic_matter(),
            organic_priority: String::new(),
            use_box_of_seeds: false,
            log_events: false,
            view_matching: ViewMatcher::default(),
            commands: CommandSettings::default(),
        }
    }
}

impl ComposterSettings {
    /// Enabled organic matter names in feeding order.
    ///
    /// Priority entries come first (unknown or disabled entries are dropped),
    /// then every remaining enabled item in declaration order.
    pub fn preferred_organic_matter(&self) -> Vec<&'static str> {
        let mut ordered: Vec<OrganicMatter> = Vec::new();

        for token in self.organic_priority.split('|') {
            let Some(item) = OrganicMatter::parse(token) else {
                continue;
            };
            if self.organic_matter.contains(&item) && !ordered.contains(&item) {
                ordered.push(item);
            }
        }

        for item in OrganicMatter::ALL {
            if self.organic_matter.contains(&item) && !ordered.contains(&item) {
                ordered.push(item);
            }
        }

        ordered.into_iter().map(|item| item.display_name()).collect()
    }
}

fn default_left_threshold() -> i64 {
    20_000
}

fn default_min_purse_k() -> u64 {
    100
}

fn default_search_origin() -> [i32; 3] {
    [-11, 72, -27]
}

fn default_click_delay_ms() -> u64 {
    150
}

fn default_organic_matter() -> Vec<OrganicMatter> {
    OrganicMatter::ALL.to_vec()
}

fn default_true() -> bool {
    true
}

/// Pathfinder used to reach the composter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMethod {
    #[default]
    Fly,
    Walk,
}

impl std::fmt::Display for TravelMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TravelMethod::Fly => write!(f, "Fly"),
            TravelMethod::Walk => write!(f, "Walk"),
        }
    }
}

/// Chat commands the controller sends
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandSettings {
    /// Disables other automation before travelling
    #[serde(default = "default_stop_other")]
    pub stop_other: String,

    /// Relocates to the staging area
    #[serde(default = "default_teleport")]
    pub teleport: String,

    /// End sequence; the first entry is the relocation command
    #[serde(default = "default_end_sequence")]
    pub end_sequence: Vec<String>,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            stop_other: default_stop_other(),
            teleport: default_teleport(),
            end_sequence: default_end_sequence(),
        }
    }
}

fn default_stop_other() -> String {
    "/ez-stopscript".to_string()
}

fn default_teleport() -> String {
    "/tptoplot barn".to_string()
}

fn default_end_sequence() -> Vec<String> {
    vec![
        "/warp garden".to_string(),
        "/ez-listfarms".to_string(),
        "/ez-startscript netherwart:1".to_string(),
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Organic Matter
// ─────────────────────────────────────────────────────────────────────────────

/// Enchanted crops accepted as organic matter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganicMatter {
    EnchantedWheat,
    EnchantedCactus,
    EnchantedCarrot,
    EnchantedFeather,
    EnchantedCocoaBeans,
    EnchantedLeather,
    EnchantedMelon,
    EnchantedRedMushroom,
    EnchantedMutton,
    EnchantedNetherWart,
    EnchantedPork,
    EnchantedPotato,
    EnchantedPumpkin,
    EnchantedRabbit,
    EnchantedChicken,
    EnchantedSeeds,
    EnchantedSugarCane,
}

impl OrganicMatter {
    pub const ALL: [OrganicMatter; 17] = [
        OrganicMatter::EnchantedWheat,
        OrganicMatter::EnchantedCactus,
        OrganicMatter::EnchantedCarrot,
        OrganicMatter::EnchantedFeather,
        OrganicMatter::EnchantedCocoaBeans,
        OrganicMatter::EnchantedLeather,
        OrganicMatter::EnchantedMelon,
        OrganicMatter::EnchantedRedMushroom,
        OrganicMatter::EnchantedMutton,
        OrganicMatter::EnchantedNetherWart,
        OrganicMatter::EnchantedPork,
        OrganicMatter::EnchantedPotato,
        OrganicMatter::EnchantedPumpkin,
        OrganicMatter::EnchantedRabbit,
        OrganicMatter::EnchantedChicken,
        OrganicMatter::EnchantedSeeds,
        OrganicMatter::EnchantedSugarCane,
    ];

    /// Item name as it appears in inventories
    pub fn display_name(&self) -> &'static str {
        match self {
            OrganicMatter::EnchantedWheat => "Enchanted Wheat",
            OrganicMatter::EnchantedCactus => "Enchanted Cactus",
            OrganicMatter::EnchantedCarrot => "Enchanted Carrot",
            OrganicMatter::EnchantedFeather => "Enchanted Feather",
            OrganicMatter::EnchantedCocoaBeans => "Enchanted Cocoa Beans",
            OrganicMatter::EnchantedLeather => "Enchanted Leather",
            OrganicMatter::EnchantedMelon => "Enchanted Melon",
            OrganicMatter::EnchantedRedMushroom => "Enchanted Red Mushroom",
            OrganicMatter::EnchantedMutton => "Enchanted Mutton",
            OrganicMatter::EnchantedNetherWart => "Enchanted Nether Wart",
            OrganicMatter::EnchantedPork => "Enchanted Pork",
            OrganicMatter::EnchantedPotato => "Enchanted Potato",
            OrganicMatter::EnchantedPumpkin => "Enchanted Pumpkin",
            OrganicMatter::EnchantedRabbit => "Enchanted Rabbit",
            OrganicMatter::EnchantedChicken => "Enchanted Chicken",
            OrganicMatter::EnchantedSeeds => "Enchanted Seeds",
            OrganicMatter::EnchantedSugarCane => "Enchanted Sugar Cane",
        }
    }

    /// Accepts a snake_case identifier or a display name (case-insensitive)
    pub fn parse(token: &str) -> Option<OrganicMatter> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        let normalized = token.to_ascii_lowercase().replace(' ', "_");
        Self::ALL.into_iter().find(|item| {
            item.display_name().to_ascii_lowercase().replace(' ', "_") == normalized
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// View Matching
// ─────────────────────────────────────────────────────────────────────────────

/// Single discipline for "is the expected menu open" checks.
///
/// Substring matching tolerates decorated titles but collides when one menu
/// title contains another (e.g. "SkyMart" inside "SkyMart Farming").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMatcher {
    #[default]
    Substring,
    Exact,
}

impl ViewMatcher {
    /// True when the open view matches any of the expected names
    pub fn matches<S: AsRef<str>>(&self, open_view: Option<&str>, expected: &[S]) -> bool {
        let Some(view) = open_view else {
            return false;
        };
        expected.iter().any(|name| match self {
            ViewMatcher::Substring => view.contains(name.as_ref()),
            ViewMatcher::Exact => view == name.as_ref(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pacing
// ─────────────────────────────────────────────────────────────────────────────

/// Base GUI delay shared by every flow
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuiSettings {
    #[serde(default = "default_gui_delay_ms")]
    pub delay_ms: u64,

    /// Upper bound of the random extra added to `delay_ms`
    #[serde(default = "default_gui_delay_randomness_ms")]
    pub delay_randomness_ms: u64,
}

impl Default for GuiSettings {
    fn default() -> Self {
        Self {
            delay_ms: default_gui_delay_ms(),
            delay_randomness_ms: default_gui_delay_randomness_ms(),
        }
    }
}

impl GuiSettings {
    /// Stall window: 7.5 s plus the worst-case GUI delay
    pub fn stuck_window_ms(&self) -> u64 {
        7_500u64
            .saturating_add(self.delay_ms)
            .saturating_add(self.delay_randomness_ms)
    }
}

fn default_gui_delay_ms() -> u64 {
    250
}

fn default_gui_delay_randomness_ms() -> u64 {
    100
}

/// Periodic re-runs after a completed End phase
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackgroundLoopSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
}

impl Default for BackgroundLoopSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: default_interval_minutes(),
        }
    }
}

impl BackgroundLoopSettings {
    /// Interval in milliseconds; never shorter than one minute
    pub fn interval_ms(&self) -> u64 {
        self.interval_minutes.max(1).saturating_mul(60_000)
    }
}

fn default_interval_minutes() -> u64 {
    30
}

// ─────────────────────────────────────────────────────────────────────────────
// Purchase Flows
// ─────────────────────────────────────────────────────────────────────────────

/// Settings for every purchase flow
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PurchaseSettings {
    #[serde(default)]
    pub menu: MenuSettings,

    #[serde(default)]
    pub biofuel: BiofuelBuyerSettings,

    #[serde(default)]
    pub box_of_seeds: SeedsBuyerSettings,

    #[serde(default)]
    pub shopping: ShoppingSettings,
}

/// Menu path from the hub command down to the shop category
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MenuSettings {
    #[serde(default = "default_hub_command")]
    pub hub_command: String,

    #[serde(default = "default_hub_view")]
    pub hub_view: Vec<String>,

    #[serde(default = "default_store_slot")]
    pub store_slot: Vec<String>,

    #[serde(default = "default_store_view")]
    pub store_view: Vec<String>,

    #[serde(default = "default_category_slot")]
    pub category_slot: Vec<String>,

    #[serde(default = "default_category_view")]
    pub category_view: Vec<String>,
}

impl Default for MenuSettings {
    fn default() -> Self {
        Self {
            hub_command: default_hub_command(),
            hub_view: default_hub_view(),
            store_slot: default_store_slot(),
            store_view: default_store_view(),
            category_slot: default_category_slot(),
            category_view: default_category_view(),
        }
    }
}

fn default_hub_command() -> String {
    "/desk".to_string()
}

fn default_hub_view() -> Vec<String> {
    vec!["Desk".to_string()]
}

fn default_store_slot() -> Vec<String> {
    vec!["SkyMart".to_string()]
}

fn default_store_view() -> Vec<String> {
    vec!["SkyMart".to_string()]
}

fn default_category_slot() -> Vec<String> {
    vec!["Diamond Hoe".to_string(), "Farming Essentials".to_string()]
}

fn default_category_view() -> Vec<String> {
    vec!["Farming".to_string(), "Essentials".to_string()]
}

/// Biofuel: right-click submenu with a batch picker
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BiofuelBuyerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_batch")]
    pub batch: u32,

    #[serde(default = "default_flow_timeout_ms")]
    pub timeout_ms: u64,

    /// Added to every delay the flow schedules
    #[serde(default)]
    pub gui_delay_ms: u64,

    /// 0 = errors only, 1 = transitions, 2 = clicks and delays, 3 = every tick
    #[serde(default = "default_debug_level")]
    pub debug_level: u8,

    #[serde(default = "default_single_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub batch_label_override: String,

    #[serde(default)]
    pub confirm_label_override: String,

    #[serde(default)]
    pub menu_name_override: String,
}

impl Default for BiofuelBuyerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            batch: default_batch(),
            timeout_ms: default_flow_timeout_ms(),
            gui_delay_ms: 0,
            debug_level: default_debug_level(),
            max_retries: default_single_retries(),
            batch_label_override: String::new(),
            confirm_label_override: String::new(),
            menu_name_override: String::new(),
        }
    }
}

/// Box of Seeds: bought by shift-clicking the shop entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeedsBuyerSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_batch")]
    pub batch: u32,

    #[serde(default = "default_flow_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub gui_delay_ms: u64,

    #[serde(default = "default_debug_level")]
    pub debug_level: u8,

    #[serde(default = "default_single_retries")]
    pub max_retries: u32,
}

impl Default for SeedsBuyerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            batch: default_batch(),
            timeout_ms: default_flow_timeout_ms(),
            gui_delay_ms: 0,
            debug_level: default_debug_level(),
            max_retries: default_single_retries(),
        }
    }
}

/// Multi-item shopping list flow
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShoppingSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_shopping_timeout_ms")]
    pub timeout_ms: u64,

    /// Pause between two items
    #[serde(default = "default_purchase_delay_ms")]
    pub purchase_delay_ms: u64,

    /// Pause before a retry pass
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Number of retry passes over under-delivered items
    #[serde(default = "default_shopping_retries")]
    pub max_retries: u32,

    #[serde(default = "default_debug_level")]
    pub debug_level: u8,
}

impl Default for ShoppingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: default_shopping_timeout_ms(),
            purchase_delay_ms: default_purchase_delay_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retries: default_shopping_retries(),
            debug_level: default_debug_level(),
        }
    }
}

fn default_batch() -> u32 {
    1
}

fn default_flow_timeout_ms() -> u64 {
    2_000
}

fn default_shopping_timeout_ms() -> u64 {
    3_000
}

fn default_purchase_delay_ms() -> u64 {
    800
}

fn default_retry_delay_ms() -> u64 {
    2_000
}

fn default_debug_level() -> u8 {
    1
}

fn default_single_retries() -> u32 {
    2
}

fn default_shopping_retries() -> u32 {
    3
}
