//! Shared purchase-flow machinery
//!
//! [`FlowCore`] owns the parts every flow has in common: the state, the
//! pacing and timeout timers, the debug level, and the walk from the hub
//! command down to the shop category. Concrete flows embed it and only
//! implement the states after [`PurchaseState::SelectItem`].

use std::time::Instant;

use composter_core::prelude::*;
use composter_core::{ClickType, Slot, Timer};

use super::PurchaseState;
use crate::config::{MenuSettings, ViewMatcher, MAX_DEBUG_LEVEL};
use crate::pacing::Pacing;
use crate::world::{find_any, World};

/// Verbosity of a flow's own tracing.
///
/// 0 logs errors only, 1 adds transitions, 2 adds clicks and delays, 3 adds
/// a line on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct DebugLevel(u8);

impl DebugLevel {
    pub fn new(level: u8) -> Self {
        Self(level.min(MAX_DEBUG_LEVEL))
    }

    pub fn allows(&self, level: u8) -> bool {
        self.0 >= level
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

/// Timing knobs of one flow
#[derive(Debug, Clone, Copy)]
pub struct FlowTiming {
    /// Bound on every "await view" step
    pub timeout_ms: u64,
    /// Added to every delay the flow schedules
    pub extra_delay_ms: u64,
}

/// State and navigation shared by every purchase flow
#[derive(Debug)]
pub struct FlowCore {
    label: &'static str,
    state: PurchaseState,
    /// State the flow was in when it last stopped
    last_state: Option<PurchaseState>,
    delay: Timer,
    timeout: Timer,
    timing: FlowTiming,
    debug: DebugLevel,
    pacing: Pacing,
    menu: MenuSettings,
    matcher: ViewMatcher,
    fault: Option<Fault>,
}

impl FlowCore {
    pub fn new(
        label: &'static str,
        menu: MenuSettings,
        matcher: ViewMatcher,
        timing: FlowTiming,
        debug: DebugLevel,
        pacing: Pacing,
    ) -> Self {
        Self {
            label,
            state: PurchaseState::Idle,
            last_state: None,
            delay: Timer::new(),
            timeout: Timer::new(),
            timing,
            debug,
            pacing,
            menu,
            matcher,
            fault: None,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn state(&self) -> PurchaseState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state != PurchaseState::Idle
    }

    /// The fault that failed the last session, if any
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn ended_in(&self, state: PurchaseState) -> bool {
        !self.is_running() && self.last_state == Some(state)
    }

    pub fn has_failed(&self) -> bool {
        self.state == PurchaseState::Failed || self.ended_in(PurchaseState::Failed)
    }

    /// Reset for a new session and enter the first navigation state
    pub fn begin(&mut self) {
        self.last_state = None;
        self.fault = None;
        self.delay.reset();
        self.timeout.reset();
        self.state = PurchaseState::OpenHub;
        if self.debug.allows(1) {
            debug!("[{}] Session started", self.label);
        }
    }

    /// Back to Idle, remembering where the session ended
    pub fn halt(&mut self) {
        if self.is_running() {
            if self.debug.allows(1) {
                debug!("[{}] Stopping in {}", self.label, self.state);
            }
            self.last_state = Some(self.state);
        }
        self.state = PurchaseState::Idle;
        self.delay.reset();
        self.timeout.reset();
    }

    /// True while a scheduled pause is still running
    pub fn is_waiting(&self, now: Instant) -> bool {
        self.delay.is_pending(now)
    }

    /// Teardown on the tick a terminal state is reached.
    ///
    /// Returns true when the flow just stopped.
    pub fn finish_if_terminal(&mut self, world: &mut dyn World) -> bool {
        if !self.state.is_terminal() {
            return false;
        }
        if self.state == PurchaseState::Done {
            info!("[{}] Purchase completed", self.label);
        }
        if world.open_view().is_some() {
            world.close_view();
        }
        self.halt();
        true
    }

    // ─────────────────────────────────────────────────────────────
    // Transitions and timers
    // ─────────────────────────────────────────────────────────────

    pub fn transition(&mut self, next: PurchaseState) {
        if self.debug.allows(1) {
            debug!("[{}] {} -> {}", self.label, self.state, next);
        }
        self.state = next;
    }

    pub fn fail(&mut self, fault: Fault) {
        error!("[{}] Failed in {}: {}", self.label, self.state, fault);
        self.fault = Some(fault);
        self.transition(PurchaseState::Failed);
    }

    /// Pause for `ms` plus the flow's extra delay
    pub fn delay_ms(&mut self, now: Instant, ms: u64) {
        let total = ms.saturating_add(self.timing.extra_delay_ms);
        if self.debug.allows(2) {
            debug!(
                "[{}] Delay {}ms (base {}ms + {}ms)",
                self.label, total, ms, self.timing.extra_delay_ms
            );
        }
        self.delay.schedule_ms(now, total);
    }

    /// Pause for a randomized GUI delay
    pub fn gui_delay(&mut self, now: Instant) {
        let ms = self.pacing.gui_delay();
        self.delay_ms(now, ms);
    }

    pub fn arm_timeout(&mut self, now: Instant) {
        let ms = self.timing.timeout_ms.saturating_add(self.timing.extra_delay_ms);
        self.timeout.schedule_ms(now, ms);
    }

    pub fn timed_out(&self, now: Instant) -> bool {
        self.timeout.passed(now)
    }

    // ─────────────────────────────────────────────────────────────
    // World helpers
    // ─────────────────────────────────────────────────────────────

    pub fn click(&self, world: &mut dyn World, slot: &Slot, click: ClickType) {
        if self.debug.allows(2) {
            debug!(
                "[{}] {:?} click on '{}' (slot {}, stack {})",
                self.label, click, slot.name, slot.index, slot.stack_size
            );
        }
        world.click_slot(slot.index, click);
    }

    pub fn view_matches<S: AsRef<str>>(&self, world: &dyn World, expected: &[S]) -> bool {
        self.matcher
            .matches(world.open_view().as_deref(), expected)
    }

    /// Per-tick trace at the highest debug level
    pub fn trace_tick(&self, world: &dyn World) {
        if self.debug.allows(3) {
            trace!(
                "[{}] tick in {} (view: {:?})",
                self.label,
                self.state,
                world.open_view()
            );
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────

    /// Advance one navigation step. Call only in a navigation state.
    pub fn navigate(&mut self, now: Instant, world: &mut dyn World) {
        match self.state {
            PurchaseState::OpenHub => self.open_hub(now, world),
            PurchaseState::AwaitHub => {
                let expected = self.menu.hub_view.clone();
                self.await_view(now, world, &expected, PurchaseState::OpenStore);
            }
            PurchaseState::OpenStore => {
                let names = self.menu.store_slot.clone();
                self.click_through(now, world, &names, PurchaseState::AwaitStore);
            }
            PurchaseState::AwaitStore => {
                let expected = self.menu.store_view.clone();
                self.await_view(now, world, &expected, PurchaseState::OpenCategory);
            }
            PurchaseState::OpenCategory => {
                let names = self.menu.category_slot.clone();
                self.click_through(now, world, &names, PurchaseState::AwaitCategory);
            }
            PurchaseState::AwaitCategory => {
                let expected = self.menu.category_view.clone();
                self.await_view(now, world, &expected, PurchaseState::SelectItem);
            }
            other => warn!("[{}] navigate() called in {}", self.label, other),
        }
    }

    fn open_hub(&mut self, now: Instant, world: &mut dyn World) {
        if world.open_view().is_some() {
            world.close_view();
            self.gui_delay(now);
            return;
        }

        world.stop_movement();
        if self.debug.allows(2) {
            debug!("[{}] Sending {}", self.label, self.menu.hub_command);
        }
        world.send_command(&self.menu.hub_command);
        self.transition(PurchaseState::AwaitHub);
        self.arm_timeout(now);
    }

    /// Wait for one of `expected`; fail once the timeout passes
    pub fn await_view(
        &mut self,
        now: Instant,
        world: &dyn World,
        expected: &[String],
        next: PurchaseState,
    ) {
        if self.view_matches(world, expected) {
            self.timeout.reset();
            self.transition(next);
            self.gui_delay(now);
        } else if self.timed_out(now) {
            self.fail(Fault::timeout(expected.join(" or ")));
        } else if self.debug.allows(2) {
            debug!(
                "[{}] Waiting for {:?}, current view {:?}",
                self.label,
                expected,
                world.open_view()
            );
        }
    }

    /// Click the first slot matching `names` and wait for the next view
    fn click_through(
        &mut self,
        now: Instant,
        world: &mut dyn World,
        names: &[String],
        next: PurchaseState,
    ) {
        match find_any(world, names) {
            Some(slot) => {
                self.click(world, &slot, ClickType::Left);
                self.transition(next);
                self.arm_timeout(now);
            }
            None => {
                let view = world.open_view().unwrap_or_default();
                self.fail(Fault::not_found(names.join("/"), view));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuiSettings;
    use crate::test_utils::FakeWorld;
    use std::time::Duration;

    fn core(timeout_ms: u64) -> FlowCore {
        FlowCore::new(
            "Test",
            MenuSettings::default(),
            ViewMatcher::Substring,
            FlowTiming {
                timeout_ms,
                extra_delay_ms: 0,
            },
            DebugLevel::new(3),
            Pacing::seeded(GuiSettings::default(), 1),
        )
    }

    #[test]
    fn test_debug_level_clamped() {
        assert_eq!(DebugLevel::new(9).value(), 3);
        assert!(DebugLevel::new(2).allows(2));
        assert!(!DebugLevel::new(2).allows(3));
        assert!(!DebugLevel::new(0).allows(1));
    }

    #[test]
    fn test_open_hub_closes_stray_view_first() {
        let now = Instant::now();
        let mut world = FakeWorld::new().with_view("Composter", vec![]);
        let mut core = core(2_000);
        core.begin();

        core.navigate(now, &mut world);
        assert_eq!(core.state(), PurchaseState::OpenHub);
        assert!(world.open_view().is_none());
        assert!(world.commands().is_empty());

        let later = now + Duration::from_secs(1);
        core.navigate(later, &mut world);
        assert_eq!(core.state(), PurchaseState::AwaitHub);
        assert_eq!(world.commands(), &["/desk".to_string()]);
        assert!(world.stopped_movement() >= 1);
    }

    #[test]
    fn test_await_view_times_out() {
        let now = Instant::now();
        let mut world = FakeWorld::new();
        let mut core = core(2_000);
        core.begin();
        core.navigate(now, &mut world);
        assert_eq!(core.state(), PurchaseState::AwaitHub);

        core.navigate(now + Duration::from_millis(1_999), &mut world);
        assert_eq!(core.state(), PurchaseState::AwaitHub);

        core.navigate(now + Duration::from_millis(2_000), &mut world);
        assert_eq!(core.state(), PurchaseState::Failed);
        assert!(matches!(core.fault(), Some(Fault::Timeout { .. })));
    }

    #[test]
    fn test_missing_store_slot_is_not_found() {
        let now = Instant::now();
        let mut world = FakeWorld::new().with_view("Desk", vec![Slot::new(1, "Profile", 1)]);
        let mut core = core(2_000);
        core.begin();
        core.transition(PurchaseState::OpenStore);

        core.navigate(now, &mut world);
        assert_eq!(core.state(), PurchaseState::Failed);
        assert_eq!(
            core.fault(),
            Some(&Fault::not_found("SkyMart", "Desk"))
        );
    }

    #[test]
    fn test_category_alternate_name() {
        let now = Instant::now();
        let mut world = FakeWorld::new()
            .with_view("SkyMart", vec![Slot::new(20, "Farming Essentials", 1)]);
        let mut core = core(2_000);
        core.begin();
        core.transition(PurchaseState::OpenCategory);

        core.navigate(now, &mut world);
        assert_eq!(core.state(), PurchaseState::AwaitCategory);
        assert_eq!(world.clicks(), &[(20, ClickType::Left)]);
    }

    #[test]
    fn test_halt_records_last_state_once() {
        let mut core = core(2_000);
        core.begin();
        core.transition(PurchaseState::Done);
        core.halt();
        core.halt();
        assert!(core.ended_in(PurchaseState::Done));
        assert!(!core.is_running());
        assert!(!core.has_failed());
    }
}
