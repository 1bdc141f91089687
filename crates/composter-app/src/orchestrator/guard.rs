//! Start preconditions
//!
//! Pure check of whether a run may start. The orchestrator turns the
//! rejection into a notice; nothing here has side effects.

use composter_core::{needs, BuffState, Fault, ResourceLevel, Severity};

use crate::config::ComposterSettings;
use crate::world::WorldSnapshot;

/// Why a start was refused, and how loudly to say so
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub fault: Fault,
    /// `None` for routine rejections that are only logged
    pub severity: Option<Severity>,
}

impl Rejection {
    fn quiet(reason: &str) -> Self {
        Self {
            fault: Fault::precondition(reason),
            severity: None,
        }
    }

    fn error(fault: Fault) -> Self {
        Self {
            fault,
            severity: Some(Severity::Error),
        }
    }

    fn warning(reason: String) -> Self {
        Self {
            fault: Fault::precondition(reason),
            severity: Some(Severity::Warning),
        }
    }
}

/// Lifecycle flags the check needs besides the snapshot
#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    pub toggled: bool,
    pub running: bool,
}

/// Decide whether a run may start now.
///
/// A manual start skips the contest, purse and threshold checks.
pub fn check_start(
    settings: &ComposterSettings,
    lifecycle: Lifecycle,
    snapshot: &WorldSnapshot,
    manual: bool,
) -> Result<(), Rejection> {
    if !lifecycle.toggled {
        return Err(Rejection::quiet("toggled off"));
    }
    if lifecycle.running {
        return Err(Rejection::quiet("already running"));
    }
    if !snapshot.in_garden {
        return Err(Rejection::quiet("not in the garden"));
    }
    if !snapshot.world_loaded() {
        return Err(Rejection::quiet("no world loaded"));
    }
    if snapshot.other_automation_active {
        return Err(Rejection::quiet("another automation is running"));
    }

    if let Some(seconds) = snapshot.server_closing_secs {
        return Err(Rejection::error(Fault::ServerClosing { seconds }));
    }

    if settings.require_cookie_buff && snapshot.cookie_buff == BuffState::NotActive {
        return Err(Rejection::error(Fault::precondition(
            "Cookie buff is not active, skipping...",
        )));
    }

    if manual {
        return Ok(());
    }

    if settings.pause_during_contest && snapshot.contest_active {
        return Err(Rejection::error(Fault::precondition(
            "Jacob's contest is active, skipping...",
        )));
    }

    // An unknown purse never passes the minimum
    let purse = snapshot.purse.unwrap_or(0);
    if purse < settings.min_purse_k.saturating_mul(1_000) {
        return Err(Rejection::error(Fault::precondition(
            "The player's purse is too low, skipping...",
        )));
    }

    let matter = tab_level(snapshot.organic_matter);
    let fuel = tab_level(snapshot.fuel);
    let needs_matter = needs(matter, settings.organic_matter_left);
    let needs_fuel = needs(fuel, settings.fuel_left);
    if !needs_matter && !needs_fuel {
        return Err(Rejection::warning(format!(
            "Resources are above thresholds (OM: {}, Fuel: {}), skipping",
            display_count(snapshot.organic_matter),
            display_count(snapshot.fuel)
        )));
    }

    Ok(())
}

/// Tab-list counts carry no maximum; compare against the raw threshold
fn tab_level(count: Option<u64>) -> Option<ResourceLevel> {
    count.map(|current| ResourceLevel::new(current, u64::MAX))
}

fn display_count(count: Option<u64>) -> String {
    match count {
        Some(count) => count.to_string(),
        None => ResourceLevel::UNKNOWN_SENTINEL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use composter_core::Vec3;

    const ON: Lifecycle = Lifecycle {
        toggled: true,
        running: false,
    };

    fn ready_snapshot() -> WorldSnapshot {
        let mut snapshot = WorldSnapshot::at(Instant::now());
        snapshot.player_position = Some(Vec3::new(0.0, 70.0, 0.0));
        snapshot.in_garden = true;
        snapshot.cookie_buff = BuffState::Active;
        snapshot.purse = Some(5_000_000);
        snapshot.organic_matter = Some(1_000);
        snapshot.fuel = Some(90_000);
        snapshot
    }

    #[test]
    fn test_ready_snapshot_passes() {
        let settings = ComposterSettings::default();
        assert!(check_start(&settings, ON, &ready_snapshot(), false).is_ok());
    }

    #[test]
    fn test_lifecycle_rejections_are_quiet() {
        let settings = ComposterSettings::default();
        let snapshot = ready_snapshot();

        let off = Lifecycle {
            toggled: false,
            running: false,
        };
        let rejection = check_start(&settings, off, &snapshot, true).unwrap_err();
        assert_eq!(rejection.severity, None);

        let running = Lifecycle {
            toggled: true,
            running: true,
        };
        let rejection = check_start(&settings, running, &snapshot, true).unwrap_err();
        assert_eq!(rejection.severity, None);
    }

    #[test]
    fn test_requires_garden_and_world() {
        let settings = ComposterSettings::default();

        let mut snapshot = ready_snapshot();
        snapshot.in_garden = false;
        assert!(check_start(&settings, ON, &snapshot, true).is_err());

        let mut snapshot = ready_snapshot();
        snapshot.player_position = None;
        assert!(check_start(&settings, ON, &snapshot, true).is_err());

        let mut snapshot = ready_snapshot();
        snapshot.other_automation_active = true;
        assert!(check_start(&settings, ON, &snapshot, true).is_err());
    }

    #[test]
    fn test_server_closing_blocks_manual_start() {
        let settings = ComposterSettings::default();
        let mut snapshot = ready_snapshot();
        snapshot.server_closing_secs = Some(30);

        let rejection = check_start(&settings, ON, &snapshot, true).unwrap_err();
        assert_eq!(rejection.fault, Fault::ServerClosing { seconds: 30 });
        assert_eq!(rejection.severity, Some(Severity::Error));
    }

    #[test]
    fn test_cookie_buff_only_when_required() {
        let mut settings = ComposterSettings::default();
        let mut snapshot = ready_snapshot();
        snapshot.cookie_buff = BuffState::NotActive;
        assert!(check_start(&settings, ON, &snapshot, false).is_ok());

        settings.require_cookie_buff = true;
        assert!(check_start(&settings, ON, &snapshot, true).is_err());

        // Unknown buff state does not block
        snapshot.cookie_buff = BuffState::Unknown;
        assert!(check_start(&settings, ON, &snapshot, false).is_ok());
    }

    #[test]
    fn test_manual_start_skips_contest_purse_and_thresholds() {
        let settings = ComposterSettings::default();
        let mut snapshot = ready_snapshot();
        snapshot.contest_active = true;
        snapshot.purse = Some(0);
        snapshot.organic_matter = Some(900_000);
        snapshot.fuel = Some(900_000);

        assert!(check_start(&settings, ON, &snapshot, true).is_ok());
        assert!(check_start(&settings, ON, &snapshot, false).is_err());
    }

    #[test]
    fn test_contest_pause_can_be_disabled() {
        let mut settings = ComposterSettings::default();
        settings.pause_during_contest = false;
        let mut snapshot = ready_snapshot();
        snapshot.contest_active = true;
        assert!(check_start(&settings, ON, &snapshot, false).is_ok());
    }

    #[test]
    fn test_purse_minimum_in_thousands() {
        let settings = ComposterSettings::default();
        let mut snapshot = ready_snapshot();

        snapshot.purse = Some(99_999);
        assert!(check_start(&settings, ON, &snapshot, false).is_err());

        snapshot.purse = Some(100_000);
        assert!(check_start(&settings, ON, &snapshot, false).is_ok());

        snapshot.purse = None;
        assert!(check_start(&settings, ON, &snapshot, false).is_err());
    }

    #[test]
    fn test_resources_above_thresholds_warns() {
        let settings = ComposterSettings::default();
        let mut snapshot = ready_snapshot();
        snapshot.organic_matter = Some(50_000);
        snapshot.fuel = Some(50_000);

        let rejection = check_start(&settings, ON, &snapshot, false).unwrap_err();
        assert_eq!(rejection.severity, Some(Severity::Warning));
        assert!(rejection.fault.to_string().contains("OM: 50000"));
    }

    #[test]
    fn test_unknown_levels_never_need() {
        let settings = ComposterSettings::default();
        let mut snapshot = ready_snapshot();
        snapshot.organic_matter = None;
        snapshot.fuel = None;
        assert!(check_start(&settings, ON, &snapshot, false).is_err());
    }
}
