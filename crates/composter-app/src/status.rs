//! Serializable snapshot of the controller for HUDs and headless output

use std::time::Instant;

use composter_core::resource;
use serde::Serialize;

use crate::orchestrator::{MainState, OperateState, Orchestrator, TravelState, Trigger};

/// Everything a status display needs, in one flat record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerStatus {
    pub toggled: bool,
    pub running: bool,
    pub trigger: Trigger,
    pub main: MainState,
    pub travel: TravelState,
    pub operate: OperateState,
    /// `"<flow>:<state>"` while a purchase flow is delegated to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase: Option<String>,
    pub organic_matter: String,
    pub fuel: String,
    /// Milliseconds until the next periodic run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run_ms: Option<u64>,
    pub loop_enabled: bool,
    pub interval_minutes: u64,
    pub restarts: u32,
    pub enabled_items: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fault: Option<String>,
}

impl Orchestrator {
    pub fn status(&self, now: Instant) -> ControllerStatus {
        let settings = self.settings();
        let levels = self.levels();

        ControllerStatus {
            toggled: self.is_toggled(),
            running: self.is_running(),
            trigger: self.trigger(),
            main: self.main_state(),
            travel: self.travel_state(),
            operate: self.operate_state(),
            purchase: self
                .active_flow()
                .map(|kind| format!("{}:{}", kind, self.flow(kind).state())),
            organic_matter: resource::describe(levels.organic_matter),
            fuel: resource::describe(levels.fuel),
            next_run_ms: self
                .next_run_remaining(now)
                .map(|left| u64::try_from(left.as_millis()).unwrap_or(u64::MAX)),
            loop_enabled: settings.background_loop.enabled,
            interval_minutes: settings.background_loop.interval_minutes.max(1),
            restarts: self.restarts(),
            enabled_items: settings
                .composter
                .preferred_organic_matter()
                .into_iter()
                .map(str::to_string)
                .collect(),
            last_fault: self.last_fault().map(ToString::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use composter_core::ResourceLevel;
    use crate::config::{GuiSettings, OrganicMatter, Settings};
    use crate::pacing::Pacing;

    fn orchestrator(settings: Settings) -> Orchestrator {
        Orchestrator::new(settings, Pacing::seeded(GuiSettings::default(), 3))
    }

    #[test]
    fn test_idle_status() {
        let mut settings = Settings::default();
        settings.composter.organic_matter = vec![OrganicMatter::EnchantedPotato];
        let ctl = orchestrator(settings);

        let status = ctl.status(Instant::now());
        assert!(!status.running);
        assert_eq!(status.main, MainState::Idle);
        assert_eq!(status.purchase, None);
        assert_eq!(status.organic_matter, status.fuel);
        assert!(status.organic_matter.contains(&ResourceLevel::UNKNOWN_SENTINEL.to_string()));
        assert_eq!(status.next_run_ms, None);
        assert_eq!(status.interval_minutes, 30);
        assert_eq!(status.enabled_items, vec!["Enchanted Potato".to_string()]);
    }

    #[test]
    fn test_status_serializes_flat() {
        let mut settings = Settings::default();
        settings.composter.enabled = true;
        let mut ctl = orchestrator(settings);
        let now = Instant::now();
        ctl.start(now, Trigger::Periodic);

        let json = serde_json::to_value(ctl.status(now + Duration::from_millis(10))).unwrap();
        assert_eq!(json["running"], true);
        assert_eq!(json["trigger"], "periodic");
        assert_eq!(json["main"], "Idle");
        assert!(json.get("purchase").is_none());
        assert!(json.get("last_fault").is_none());
    }
}
