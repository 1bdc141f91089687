//! Configuration file parsing for the composter controller
//!
//! Supports:
//! - `.composter/config.toml` - Global settings

pub mod settings;
pub mod types;

pub use settings::{
    init_config_dir, load_settings, save_settings, MAX_DEBUG_LEVEL, MAX_INTERVAL_MINUTES,
};
pub use types::*;
