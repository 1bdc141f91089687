//! # composter-core - Core Primitives
//!
//! Foundation crate for the composter controller. Provides the countdown
//! timer, resource label parsing, retry bookkeeping, shared domain types and
//! error handling.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, regex, tracing).
//!
//! ## Public API
//!
//! ### Timing (`timer`)
//! - [`Timer`] - Schedulable countdown driven by caller-supplied `Instant`s
//!
//! ### Resource Labels (`resource`)
//! - [`ResourceLevel`] - Parsed `current/max` pair
//! - [`parse_label()`], [`parse_lore()`] - Label parsing
//! - [`needs()`] - Threshold evaluation that ignores unknown levels
//!
//! ### Retries (`retry`)
//! - [`RetryCounter`] - Bounded per-session counter
//!
//! ### Domain Types (`types`)
//! - [`Vec3`], [`Slot`], [`ClickType`], [`BuffState`]
//! - [`Notice`], [`Severity`] - User-facing messages
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Infrastructure errors with a `recoverable` classification
//! - [`ResultExt`] - Logs context while propagating an error
//! - [`Fault`] - Controller failure taxonomy
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use composter_core::prelude::*;
//! ```

pub mod error;
pub mod logging;
pub mod resource;
pub mod retry;
pub mod timer;
pub mod types;

/// Prelude for common imports used throughout all composter crates
pub mod prelude {
    pub use super::error::{Error, Fault, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Fault, Result, ResultExt};
pub use resource::{needs, parse_label, parse_lore, ResourceLevel};
pub use retry::RetryCounter;
pub use timer::Timer;
pub use types::{BuffState, ClickType, Notice, Severity, Slot, Vec3};
