//! Settings parser for .composter/config.toml

use super::types::Settings;
use composter_core::prelude::*;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.toml";
const COMPOSTER_DIR: &str = ".composter";

/// Highest per-flow debug level
pub const MAX_DEBUG_LEVEL: u8 = 3;

/// Longest background interval: one week
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

// ─────────────────────────────────────────────────────────────────────────────
// Settings Loading
// ─────────────────────────────────────────────────────────────────────────────

/// Load settings from .composter/config.toml
///
/// Returns default settings if the file doesn't exist or can't be parsed.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = project_path.join(COMPOSTER_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match read_settings(&config_path) {
        Ok(settings) => {
            debug!("Loaded settings from {:?}", config_path);
            normalize(settings)
        }
        Err(e) => {
            warn!("Failed to load {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

fn read_settings(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Clamp values the controller cannot honour as written
fn normalize(mut settings: Settings) -> Settings {
    let purchase = &mut settings.purchase;
    for level in [
        &mut purchase.biofuel.debug_level,
        &mut purchase.box_of_seeds.debug_level,
        &mut purchase.shopping.debug_level,
    ] {
        if *level > MAX_DEBUG_LEVEL {
            warn!("debug_level {} out of range, using {}", level, MAX_DEBUG_LEVEL);
            *level = MAX_DEBUG_LEVEL;
        }
    }

    if purchase.biofuel.batch == 0 {
        warn!("purchase.biofuel.batch must be at least 1");
        purchase.biofuel.batch = 1;
    }
    if purchase.box_of_seeds.batch == 0 {
        warn!("purchase.box_of_seeds.batch must be at least 1");
        purchase.box_of_seeds.batch = 1;
    }

    let background = &mut settings.background_loop;
    if !(1..=MAX_INTERVAL_MINUTES).contains(&background.interval_minutes) {
        let clamped = background.interval_minutes.clamp(1, MAX_INTERVAL_MINUTES);
        warn!(
            "background_loop.interval_minutes {} out of range, using {}",
            background.interval_minutes, clamped
        );
        background.interval_minutes = clamped;
    }

    settings
}

/// Create a commented default config in .composter/
pub fn init_config_dir(project_path: &Path) -> Result<()> {
    let composter_dir = project_path.join(COMPOSTER_DIR);

    if !composter_dir.exists() {
        std::fs::create_dir_all(&composter_dir).context("Failed to create .composter dir")?;
    }

    let config_path = composter_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        std::fs::write(&config_path, generate_default_config())
            .context("Failed to write config.toml")?;
    }

    Ok(())
}

/// Save settings to .composter/config.toml
///
/// Uses atomic write (temp file + rename).
pub fn save_settings(project_path: &Path, settings: &Settings) -> Result<()> {
    let composter_dir = project_path.join(COMPOSTER_DIR);

    if !composter_dir.exists() {
        std::fs::create_dir_all(&composter_dir).context("Failed to create .composter dir")?;
    }

    let config_path = composter_dir.join(CONFIG_FILENAME);
    let temp_path = composter_dir.join(".config.toml.tmp");

    let content = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
    let full_content = format!("# Auto Composter Configuration\n\n{}", content);

    std::fs::write(&temp_path, &full_content).context("Failed to write temp file")?;
    std::fs::rename(&temp_path, &config_path)
        .with_context(|| format!("Failed to rename temp file to {:?}", config_path))?;

    info!("Saved settings to {:?}", config_path);
    Ok(())
}

fn generate_default_config() -> String {
    r#"# Auto Composter Configuration

[composter]
enabled = false
organic_matter_left = 20000   # Start (and fill up to) below this amount
fuel_left = 20000
min_purse_k = 100             # Periodic runs need this many thousand coins
require_cookie_buff = false
pause_during_contest = true
travel_method = "fly"         # "fly" or "walk"
auto_sell_before_filling = false
# target_position = [-11, 72, -27]
search_origin = [-11, 72, -27]
click_delay_ms = 150
fuel_click_delay_ms = 150
# Pipe-delimited; enabled items not listed here are fed afterwards
organic_priority = ""
use_box_of_seeds = false
log_events = false
view_matching = "substring"   # "substring" or "exact"

[composter.commands]
stop_other = "/ez-stopscript"
teleport = "/tptoplot barn"
end_sequence = ["/warp garden", "/ez-listfarms", "/ez-startscript netherwart:1"]

[gui]
delay_ms = 250
delay_randomness_ms = 100

[background_loop]
enabled = false
interval_minutes = 30

[purchase.biofuel]
enabled = true
batch = 1
timeout_ms = 2000
debug_level = 1               # 0-3
batch_label_override = ""
confirm_label_override = ""
menu_name_override = ""

[purchase.box_of_seeds]
enabled = false
batch = 1

[purchase.shopping]
enabled = false
max_retries = 3
purchase_delay_ms = 800
retry_delay_ms = 2000
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{OrganicMatter, TravelMethod, ViewMatcher};
    use tempfile::tempdir;

    #[test]
    fn test_load_settings_defaults() {
        let temp = tempdir().unwrap();
        let settings = load_settings(temp.path());

        assert!(!settings.composter.enabled);
        assert_eq!(settings.composter.fuel_left, 20_000);
        assert_eq!(settings.background_loop.interval_minutes, 30);
    }

    #[test]
    fn test_load_settings_custom() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join(".composter");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.toml"),
            r#"
[composter]
enabled = true
travel_method = "walk"
organic_matter = ["enchanted_wheat", "enchanted_potato"]
organic_priority = "enchanted_potato"
view_matching = "exact"

[background_loop]
enabled = true
interval_minutes = 10

[purchase.shopping]
enabled = true
max_retries = 1
"#,
        )
        .unwrap();

        let settings = load_settings(temp.path());
        assert!(settings.composter.enabled);
        assert_eq!(settings.composter.travel_method, TravelMethod::Walk);
        assert_eq!(settings.composter.view_matching, ViewMatcher::Exact);
        assert_eq!(
            settings.composter.organic_matter,
            vec![OrganicMatter::EnchantedWheat, OrganicMatter::EnchantedPotato]
        );
        assert_eq!(settings.background_loop.interval_ms(), 600_000);
        assert!(settings.purchase.shopping.enabled);
        assert_eq!(settings.purchase.shopping.max_retries, 1);
        // Untouched sections keep their defaults
        assert_eq!(settings.purchase.menu.hub_command, "/desk");
        assert_eq!(settings.composter.commands.teleport, "/tptoplot barn");
    }

    #[test]
    fn test_load_settings_invalid_toml() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join(".composter");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "[composter\nenabled = yes").unwrap();

        let settings = load_settings(temp.path());
        assert!(!settings.composter.enabled);
    }

    #[test]
    fn test_read_settings_reports_parse_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[composter\nenabled = yes").unwrap();

        let err = read_settings(&path).unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_load_settings_clamps_out_of_range() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join(".composter");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.toml"),
            "[purchase.biofuel]\ndebug_level = 9\nbatch = 0\n",
        )
        .unwrap();

        let settings = load_settings(temp.path());
        assert_eq!(settings.purchase.biofuel.debug_level, MAX_DEBUG_LEVEL);
        assert_eq!(settings.purchase.biofuel.batch, 1);
    }

    #[test]
    fn test_load_settings_clamps_huge_interval() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join(".composter");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.toml"),
            format!("[background_loop]\nenabled = true\ninterval_minutes = {}\n", u64::MAX / 1_000),
        )
        .unwrap();

        let settings = load_settings(temp.path());
        assert_eq!(settings.background_loop.interval_minutes, MAX_INTERVAL_MINUTES);
        assert_eq!(
            settings.background_loop.interval_ms(),
            MAX_INTERVAL_MINUTES * 60_000
        );
    }

    #[test]
    fn test_save_settings_into_missing_parent_fails() {
        let temp = tempdir().unwrap();
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let err = save_settings(&blocker, &Settings::default()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_init_config_dir_writes_parseable_default() {
        let temp = tempdir().unwrap();
        init_config_dir(temp.path()).unwrap();

        let path = temp.path().join(".composter").join("config.toml");
        assert!(path.exists());

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Settings = toml::from_str(&content).unwrap();
        assert_eq!(parsed.composter.search_origin, [-11, 72, -27]);
        assert_eq!(parsed.composter.commands.end_sequence.len(), 3);
    }

    #[test]
    fn test_init_config_dir_keeps_existing_file() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join(".composter");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "[composter]\nenabled = true\n").unwrap();

        init_config_dir(temp.path()).unwrap();

        let settings = load_settings(temp.path());
        assert!(settings.composter.enabled);
    }

    #[test]
    fn test_save_and_reload() {
        let temp = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.composter.enabled = true;
        settings.composter.target_position = Some([1, 70, 2]);
        settings.purchase.biofuel.batch = 5;

        save_settings(temp.path(), &settings).unwrap();

        let reloaded = load_settings(temp.path());
        assert!(reloaded.composter.enabled);
        assert_eq!(reloaded.composter.target_position, Some([1, 70, 2]));
        assert_eq!(reloaded.purchase.biofuel.batch, 5);
        assert!(!temp.path().join(".composter/.config.toml.tmp").exists());
    }
}
