//! Shared domain types: positions, inventory slots, clicks and notices.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Positions
// ─────────────────────────────────────────────────────────────────────────────

/// A point in the world
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Centre of an integer block position
    pub fn block_center(x: i32, y: i32, z: i32) -> Self {
        Self::new(f64::from(x) + 0.5, f64::from(y) + 0.5, f64::from(z) + 0.5)
    }

    pub fn distance_sq(&self, other: Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn distance(&self, other: Vec3) -> f64 {
        self.distance_sq(other).sqrt()
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inventory
// ─────────────────────────────────────────────────────────────────────────────

/// One slot of the currently open view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// Slot number inside the open container
    pub index: usize,
    /// Display name with formatting codes stripped
    pub name: String,
    /// Stack size shown on the item
    pub stack_size: u32,
    /// Lore lines, raw (may still contain formatting codes)
    pub lore: Vec<String>,
}

impl Slot {
    pub fn new(index: usize, name: impl Into<String>, stack_size: u32) -> Self {
        Self {
            index,
            name: name.into(),
            stack_size,
            lore: Vec::new(),
        }
    }

    pub fn with_lore<I, S>(mut self, lore: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lore = lore.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the display name contains any of the given labels
    pub fn name_contains_any<S: AsRef<str>>(&self, labels: &[S]) -> bool {
        labels.iter().any(|label| self.name.contains(label.as_ref()))
    }
}

/// How a slot is clicked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClickType {
    /// Plain left click (pick up / press a button)
    Left,
    /// Right click (opens a purchase submenu in shops)
    Right,
    /// Shift + left click (buys one unit directly in shops)
    QuickMove,
}

// ─────────────────────────────────────────────────────────────────────────────
// Game State
// ─────────────────────────────────────────────────────────────────────────────

/// State of a consumable buff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuffState {
    Active,
    NotActive,
    #[default]
    Unknown,
}

// ─────────────────────────────────────────────────────────────────────────────
// Notices
// ─────────────────────────────────────────────────────────────────────────────

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Warning,
    Error,
    Success,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Success => "success",
        }
    }
}

/// A message for the player's chat log or an outbound webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    /// Also forward to the configured webhook
    pub webhook: bool,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            webhook: false,
        }
    }

    pub fn webhook(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
            webhook: true,
        }
    }
}
