//! Orchestrator - the top-level composter state machine
//!
//! Organized into submodules:
//! - `guard`: start preconditions
//! - `watchdog`: stall detection
//! - `travel`: Travel phase handlers
//! - `operate`: PreOperateStep and Operate phase handlers
//! - `end`: end sequence and background rescheduling
//!
//! One [`Orchestrator::tick`] advances Main by at most one step, which in turn
//! advances at most one of Travel, Operate or the active purchase flow.

pub mod guard;
pub mod watchdog;

mod end;
mod operate;
mod travel;

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::time::{Duration, Instant};

use composter_core::prelude::*;
use composter_core::{Notice, ResourceLevel, Severity, Timer, Vec3};
use serde::Serialize;

use crate::action::{ActionQueue, HostAction};
use crate::config::Settings;
use crate::pacing::Pacing;
use crate::purchase::{FlowKind, ItemBuyer, PurchaseFlow, ShoppingBuyer};
use crate::world::{World, WorldSnapshot};

pub use guard::{check_start, Lifecycle, Rejection};
pub use operate::{choose_flow, FlowAvailability, COMPOSTER_VIEW, FUEL_SLOT, MATTER_SLOT};
pub use watchdog::{Verdict, Watchdog, INTERACT_WINDOW_MS, TRAVEL_WINDOW_MS};

// ─────────────────────────────────────────────────────────────────────────────
// States
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum MainState {
    #[default]
    Idle,
    Travel,
    PreOperateStep,
    Operate,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TravelState {
    #[default]
    Idle,
    RequestTeleport,
    AwaitTeleport,
    Approach,
    Locate,
    Arrived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OperateState {
    #[default]
    Idle,
    Orient,
    OpenTarget,
    Inspect,
    AwaitPurchase,
    Fill,
    Done,
}

/// What started the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// Requested by the player; skips the periodic-only checks
    #[default]
    Manual,
    /// Started by the background loop; hands control back to the macro
    Periodic,
}

/// Composter levels read from the open composter view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposterLevels {
    pub organic_matter: Option<ResourceLevel>,
    pub fuel: Option<ResourceLevel>,
}

/// Where the composter is and where to stand next to it
#[derive(Debug, Clone, Default)]
pub struct TargetCache {
    /// Standing point from the configuration
    configured: Option<Vec3>,
    /// Standing point resolved while searching
    discovered: Option<Vec3>,
    /// Last seen composter position
    entity: Option<Vec3>,
}

impl TargetCache {
    pub fn new(configured: Option<Vec3>) -> Self {
        Self {
            configured,
            ..Self::default()
        }
    }

    /// Discovered point first, then the configured one
    pub fn standing_point(&self) -> Option<Vec3> {
        self.discovered.or(self.configured)
    }

    pub fn entity(&self) -> Option<Vec3> {
        self.entity
    }

    pub fn remember(&mut self, entity: Vec3, standing_point: Vec3) {
        self.entity = Some(entity);
        self.discovered = Some(standing_point);
    }

    pub fn remember_entity(&mut self, entity: Vec3) {
        self.entity = Some(entity);
    }

    /// Drop the entity position; it is looked up again when needed
    pub fn forget_entity(&mut self) {
        self.entity = None;
    }

    /// Drop everything that was discovered at runtime
    pub fn forget(&mut self) {
        self.entity = None;
        self.discovered = None;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Orchestrator {
    settings: Settings,
    toggled: bool,
    running: bool,
    trigger: Trigger,

    main: MainState,
    travel: TravelState,
    operate: OperateState,

    /// Pacing delay; a pending delay skips the whole tick
    delay: Timer,
    watchdog: Watchdog,
    /// Background loop; survives `stop()`
    next_run: Timer,
    pacing: Pacing,

    biofuel: ItemBuyer,
    seeds: ItemBuyer,
    shopping: ShoppingBuyer,
    /// The one flow allowed to run
    active: Option<FlowKind>,
    /// Flows already tried in this run
    attempted: HashSet<FlowKind>,

    target: TargetCache,
    position_before_tp: Option<Vec3>,
    /// Levels were read once this run
    inspected: bool,
    end_step: usize,
    levels: ComposterLevels,

    actions: ActionQueue,
    restarts: u32,
    last_fault: Option<Fault>,
}

impl Orchestrator {
    pub fn new(settings: Settings, mut pacing: Pacing) -> Self {
        let biofuel = ItemBuyer::biofuel(&settings, pacing.fork());
        let seeds = ItemBuyer::box_of_seeds(&settings, pacing.fork());
        let shopping = ShoppingBuyer::new(&settings, pacing.fork());
        let configured = settings
            .composter
            .target_position
            .map(|[x, y, z]| Vec3::block_center(x, y, z));

        Self {
            toggled: settings.composter.enabled,
            running: false,
            trigger: Trigger::default(),
            main: MainState::Idle,
            travel: TravelState::Idle,
            operate: OperateState::Idle,
            delay: Timer::new(),
            watchdog: Watchdog::new(pacing.stuck_window_ms()),
            next_run: Timer::new(),
            pacing,
            biofuel,
            seeds,
            shopping,
            active: None,
            attempted: HashSet::new(),
            target: TargetCache::new(configured),
            position_before_tp: None,
            inspected: false,
            end_step: 0,
            levels: ComposterLevels::default(),
            actions: ActionQueue::new(),
            restarts: 0,
            last_fault: None,
            settings,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_toggled(&self) -> bool {
        self.toggled
    }

    /// Turn the feature on or off; turning it off stops a running controller
    pub fn set_toggled(&mut self, toggled: bool) {
        self.toggled = toggled;
        if !toggled && self.running {
            self.stop();
        }
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn main_state(&self) -> MainState {
        self.main
    }

    pub fn travel_state(&self) -> TravelState {
        self.travel
    }

    pub fn operate_state(&self) -> OperateState {
        self.operate
    }

    pub fn active_flow(&self) -> Option<FlowKind> {
        self.active
    }

    pub fn flow(&self, kind: FlowKind) -> &dyn PurchaseFlow {
        match kind {
            FlowKind::Fuel => &self.biofuel,
            FlowKind::Matter => &self.seeds,
            FlowKind::Shopping => &self.shopping,
        }
    }

    fn flow_mut(&mut self, kind: FlowKind) -> &mut dyn PurchaseFlow {
        match kind {
            FlowKind::Fuel => &mut self.biofuel,
            FlowKind::Matter => &mut self.seeds,
            FlowKind::Shopping => &mut self.shopping,
        }
    }

    pub fn levels(&self) -> ComposterLevels {
        self.levels
    }

    pub fn target(&self) -> &TargetCache {
        &self.target
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    pub fn delay(&self) -> &Timer {
        &self.delay
    }

    pub fn next_run(&self) -> &Timer {
        &self.next_run
    }

    /// Time until the next periodic run, when one is scheduled
    pub fn next_run_remaining(&self, now: Instant) -> Option<Duration> {
        self.next_run
            .is_armed()
            .then(|| self.next_run.remaining(now))
    }

    /// Stuck restarts since construction
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Why the last start was refused or the last run was cut short
    pub fn last_fault(&self) -> Option<&Fault> {
        self.last_fault.as_ref()
    }

    /// The farming macro must stay paused while this is true
    pub fn should_pause_other_work(&self) -> bool {
        self.running
    }

    /// Failsafes are noisy while teleporting and during the end sequence
    pub fn should_check_for_failsafes(&self) -> bool {
        self.travel != TravelState::AwaitTeleport && self.main != MainState::End
    }

    pub fn drain_actions(&mut self) -> Vec<HostAction> {
        self.actions.drain()
    }

    pub fn pending_actions(&self) -> &ActionQueue {
        &self.actions
    }

    // ─────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────

    /// Check start preconditions and report a refusal.
    pub fn can_start(&mut self, snapshot: &WorldSnapshot, manual: bool) -> bool {
        let lifecycle = Lifecycle {
            toggled: self.toggled,
            running: self.running,
        };
        match check_start(&self.settings.composter, lifecycle, snapshot, manual) {
            Ok(()) => true,
            Err(rejection) => {
                match rejection.severity {
                    Some(severity) => self.notify(severity, rejection.fault.to_string()),
                    None => debug!("[Composter] Not starting: {}", rejection.fault),
                }
                self.last_fault = Some(rejection.fault);
                false
            }
        }
    }

    /// Begin a run. Returns false while a run is already in progress.
    pub fn start(&mut self, now: Instant, trigger: Trigger) -> bool {
        if self.running {
            debug!("[Composter] Already running, ignoring start");
            return false;
        }

        self.reset_phases();
        self.target.forget_entity();
        self.running = true;
        self.trigger = trigger;
        self.last_fault = None;
        self.watchdog.arm(now);

        self.actions.push(HostAction::PauseMacro);
        self.notify(Severity::Warning, format!("Auto Composter started ({trigger:?})"));
        if self.settings.composter.log_events {
            self.webhook("Auto Composter started");
        }
        true
    }

    /// Force everything back to Idle. Idempotent.
    ///
    /// The background loop timer is left alone so a finished run can
    /// schedule the next one.
    pub fn stop(&mut self) {
        let was_running = self.running;
        self.running = false;
        self.reset_phases();
        self.watchdog.disarm();

        if was_running {
            self.actions.push(HostAction::HaltMovement);
            self.notify(Severity::Warning, "Auto Composter stopped");
        }
    }

    /// Make the background loop due immediately. No-op while the loop is off.
    pub fn arm_background(&mut self, now: Instant) -> bool {
        if !self.settings.background_loop.enabled {
            return false;
        }
        self.next_run.schedule_ms(now, 0);
        true
    }

    /// Start a periodic run once the background loop is due.
    ///
    /// A refused start is retried after another full interval. Returns true
    /// when a run was started.
    pub fn poll_background(&mut self, snapshot: &WorldSnapshot) -> bool {
        let now = snapshot.now;
        if self.running || !self.next_run.passed(now) {
            return false;
        }
        if !self.settings.background_loop.enabled {
            self.next_run.reset();
            return false;
        }

        if self.can_start(snapshot, false) {
            self.next_run.reset();
            self.start(now, Trigger::Periodic)
        } else {
            let interval = self.settings.background_loop.interval_ms();
            debug!("[Composter] Periodic run skipped, next attempt in {}ms", interval);
            self.next_run.schedule_ms(now, interval);
            false
        }
    }

    fn reset_phases(&mut self) {
        self.main = MainState::Idle;
        self.travel = TravelState::Idle;
        self.operate = OperateState::Idle;
        self.delay.reset();
        self.biofuel.stop();
        self.seeds.stop();
        self.shopping.stop();
        self.active = None;
        self.attempted.clear();
        self.position_before_tp = None;
        self.inspected = false;
        self.end_step = 0;
        self.levels = ComposterLevels::default();
    }

    fn restart(&mut self, now: Instant) {
        let window_ms = u64::try_from(self.watchdog.timer().duration().as_millis()).unwrap_or(u64::MAX);
        let fault = Fault::Stuck {
            state: self.state_label(),
            window_ms,
        };
        error!("[Composter] {}", fault);
        self.notify(Severity::Error, "The player is stuck, restarting the macro...");

        let trigger = self.trigger;
        self.restarts += 1;
        self.stop();
        self.start(now, trigger);
        self.last_fault = Some(fault);
    }

    fn state_label(&self) -> String {
        format!("{:?}/{:?}/{:?}", self.main, self.travel, self.operate)
    }

    // ─────────────────────────────────────────────────────────────
    // Tick
    // ─────────────────────────────────────────────────────────────

    /// Advance the controller by one step
    pub fn tick(&mut self, snapshot: &WorldSnapshot, world: &mut dyn World) {
        if !self.running {
            return;
        }
        if !snapshot.world_loaded() || !snapshot.in_garden {
            return;
        }

        let now = snapshot.now;
        if self.delay.is_pending(now) {
            return;
        }

        if let Some(seconds) = snapshot.server_closing_secs {
            let fault = Fault::ServerClosing { seconds };
            self.notify(Severity::Error, format!("Server is closing in {seconds} seconds!"));
            self.stop();
            self.last_fault = Some(fault);
            return;
        }

        let flow_running = self
            .active
            .is_some_and(|kind| self.flow(kind).is_running());
        match self
            .watchdog
            .check(now, flow_running, self.main == MainState::End)
        {
            Verdict::Quiet => {}
            Verdict::Rearm => self.watchdog.arm(now),
            Verdict::Disarm => self.watchdog.disarm(),
            Verdict::Restart => {
                self.restart(now);
                return;
            }
        }

        match self.main {
            MainState::Idle => self.handle_idle(now, world),
            MainState::Travel => travel::handle_travel(self, snapshot, world),
            MainState::PreOperateStep => operate::handle_pre_operate(self, now),
            MainState::Operate => operate::handle_operate(self, snapshot, world),
            MainState::End => end::handle_end(self, now, world),
        }
    }

    /// Pause, disable other automation, pause again, then travel
    fn handle_idle(&mut self, now: Instant, world: &mut dyn World) {
        if !self.delay.is_armed() {
            let gap = self.pacing.command_gap();
            self.delay_ms(now, gap);
            return;
        }

        let command = self.settings.composter.commands.stop_other.clone();
        debug!("[Composter] Sending {} before travel", command);
        world.send_command(&command);

        let gap = self.pacing.command_gap();
        self.delay_ms(now, gap);
        self.set_main(now, MainState::Travel);
    }

    // ─────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────

    fn set_main(&mut self, now: Instant, state: MainState) {
        debug!("[Composter] Main state: {:?}", state);
        self.main = state;
        self.watchdog.arm(now);
    }

    fn set_travel(&mut self, now: Instant, state: TravelState) {
        debug!("[Composter] Travel state: {:?}", state);
        self.travel = state;
        self.watchdog.arm(now);
    }

    fn set_operate(&mut self, now: Instant, state: OperateState) {
        debug!("[Composter] Operate state: {:?}", state);
        self.operate = state;
        self.watchdog.arm(now);
    }

    fn delay_ms(&mut self, now: Instant, ms: u64) {
        self.delay.schedule_ms(now, ms);
    }

    // ─────────────────────────────────────────────────────────────
    // Notices
    // ─────────────────────────────────────────────────────────────

    fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Debug => debug!("[Composter] {}", message),
            Severity::Warning => warn!("[Composter] {}", message),
            Severity::Error => error!("[Composter] {}", message),
            Severity::Success => info!("[Composter] {}", message),
        }
        self.actions
            .push(HostAction::Notify(Notice::new(severity, message)));
    }

    fn webhook(&mut self, message: impl Into<String>) {
        self.actions.push(HostAction::Notify(Notice::webhook(message)));
    }
}
