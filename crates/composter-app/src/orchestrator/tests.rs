//! Tests for the orchestrator

use std::time::{Duration, Instant};

use composter_core::{Fault, ResourceLevel, Severity, Vec3};

use super::*;
use crate::action::HostAction;
use crate::config::{GuiSettings, Settings};
use crate::pacing::Pacing;
use crate::purchase::{PurchaseRequest, PurchaseState, BIOFUEL};
use crate::test_utils::{Effect, FakeComposter, FakeWorld};

const STEP: Duration = Duration::from_millis(50);
const COMPOSTER_AT: Vec3 = Vec3::new(10.5, 72.0, -20.5);
const BARN: Vec3 = Vec3::new(4.5, 72.0, -20.5);

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.composter.enabled = true;
    settings
}

fn orchestrator(settings: Settings) -> Orchestrator {
    Orchestrator::new(settings, Pacing::seeded(GuiSettings::default(), 7))
}

fn garden(matter: u64, fuel: u64) -> FakeWorld {
    FakeWorld::new()
        .on_command("/tptoplot barn", Effect::MoveTo(BARN))
        .with_composter(FakeComposter::new(
            COMPOSTER_AT,
            ResourceLevel::new(matter, 40_000),
            ResourceLevel::new(fuel, 100_000),
        ))
}

fn tick(ctl: &mut Orchestrator, world: &mut FakeWorld, now: Instant) {
    let snapshot = world.snapshot(now);
    ctl.tick(&snapshot, world);
}

/// Tick until the run ends; returns the time of the last tick
fn run_until_stopped(ctl: &mut Orchestrator, world: &mut FakeWorld, start: Instant) -> Instant {
    let mut now = start;
    for _ in 0..20_000 {
        now += STEP;
        tick(ctl, world, now);
        if !ctl.is_running() {
            return now;
        }
    }
    panic!(
        "run never finished ({:?}/{:?}/{:?})",
        ctl.main_state(),
        ctl.travel_state(),
        ctl.operate_state()
    );
}

fn notices(actions: &[HostAction]) -> Vec<(Severity, String)> {
    actions
        .iter()
        .filter_map(|action| match action {
            HostAction::Notify(notice) => Some((notice.severity, notice.message.clone())),
            _ => None,
        })
        .collect()
}

fn assert_fully_idle(ctl: &Orchestrator) {
    assert!(!ctl.is_running());
    assert_eq!(ctl.main_state(), MainState::Idle);
    assert_eq!(ctl.travel_state(), TravelState::Idle);
    assert_eq!(ctl.operate_state(), OperateState::Idle);
    assert!(ctl.active_flow().is_none());
    assert!(!ctl.delay().is_armed());
    assert!(!ctl.watchdog().is_armed());
    for kind in [FlowKind::Fuel, FlowKind::Matter, FlowKind::Shopping] {
        assert_eq!(ctl.flow(kind).state(), PurchaseState::Idle);
    }
}

// ─────────────────────────────────────────────────────────
// Full runs
// ─────────────────────────────────────────────────────────

#[test]
fn test_full_run_feeds_organic_matter() {
    let mut ctl = orchestrator(settings());
    let mut world = garden(10_000, 90_000).with_item("Enchanted Wheat", 15);
    let start = Instant::now();

    assert!(ctl.can_start(&world.snapshot(start), true));
    assert!(ctl.start(start, Trigger::Manual));
    run_until_stopped(&mut ctl, &mut world, start);

    assert_eq!(world.composter().unwrap().matter.current, 20_000);
    assert_eq!(world.item_count("Enchanted Wheat"), 5);
    assert_eq!(ctl.target().standing_point(), Some(Vec3::new(11.5, 72.0, -20.5)));

    let commands = world.commands();
    assert_eq!(commands[0], "/ez-stopscript");
    assert_eq!(commands[1], "/tptoplot barn");
    assert_eq!(
        &commands[commands.len() - 3..],
        &[
            "/warp garden".to_string(),
            "/ez-listfarms".to_string(),
            "/ez-startscript netherwart:1".to_string(),
        ]
    );

    let actions = ctl.drain_actions();
    assert_eq!(actions.first(), Some(&HostAction::PauseMacro));
    assert!(actions.contains(&HostAction::HaltMovement));
    assert!(!actions.contains(&HostAction::ResumeMacro));
    assert!(notices(&actions)
        .iter()
        .any(|(severity, message)| *severity == Severity::Success && message.contains("Found Composter")));
    assert_eq!(ctl.restarts(), 0);
    assert_fully_idle(&ctl);
}

#[test]
fn test_missing_fuel_is_bought_then_fed() {
    let mut ctl = orchestrator(settings());
    let mut world = garden(30_000, 5_000).with_skymart();
    let start = Instant::now();

    assert!(ctl.start(start, Trigger::Manual));
    run_until_stopped(&mut ctl, &mut world, start);

    assert!(world.commands().contains(&"/desk".to_string()));
    // One bought, one fed; a second purchase is never attempted in the same run
    assert_eq!(world.composter().unwrap().fuel.current, 15_000);
    assert_eq!(world.item_count(BIOFUEL), 0);
    assert_eq!(
        world.commands().iter().filter(|c| *c == "/desk").count(),
        1
    );
}

#[test]
fn test_periodic_run_hands_back_to_macro() {
    let mut ctl = orchestrator(settings());
    let mut world = garden(10_000, 90_000).with_item("Enchanted Carrot", 20);
    let start = Instant::now();

    assert!(ctl.can_start(&world.snapshot(start), false));
    assert!(ctl.start(start, Trigger::Periodic));
    run_until_stopped(&mut ctl, &mut world, start);

    let actions = ctl.drain_actions();
    assert_eq!(actions.last(), Some(&HostAction::ResumeMacro));
}

#[test]
fn test_auto_sell_runs_before_operate() {
    let mut settings = settings();
    settings.composter.auto_sell_before_filling = true;
    let mut ctl = orchestrator(settings);
    let mut world = garden(10_000, 90_000).with_item("Enchanted Wheat", 15);
    let start = Instant::now();

    ctl.start(start, Trigger::Manual);
    ctl.main = MainState::PreOperateStep;
    tick(&mut ctl, &mut world, start + STEP);

    assert_eq!(ctl.main_state(), MainState::Operate);
    assert!(ctl.drain_actions().contains(&HostAction::StartAutoSell));

    // While the routine runs, Operate only waits
    let later = start + Duration::from_secs(2);
    let mut snapshot = world.snapshot(later);
    snapshot.auxiliary_sell_running = true;
    ctl.tick(&snapshot, &mut world);
    assert_eq!(ctl.operate_state(), OperateState::Idle);
    assert!(ctl.delay().is_pending(later));
}

#[test]
fn test_configured_position_skips_search() {
    let mut settings = settings();
    settings.composter.target_position = Some([11, 72, -21]);
    let mut ctl = orchestrator(settings);
    let mut world = garden(10_000, 90_000).with_item("Enchanted Wheat", 15);
    let start = Instant::now();

    ctl.start(start, Trigger::Manual);
    run_until_stopped(&mut ctl, &mut world, start);

    assert_eq!(world.paths()[0].0, Vec3::block_center(11, 72, -21));
}

#[test]
fn test_no_standing_point_ends_run() {
    let mut ctl = orchestrator(settings());
    let mut world = garden(10_000, 90_000);
    world.standable = false;
    let start = Instant::now();

    ctl.start(start, Trigger::Manual);
    run_until_stopped(&mut ctl, &mut world, start);

    assert_eq!(world.interactions(), 0);
    let errors: Vec<_> = notices(&ctl.drain_actions())
        .into_iter()
        .filter(|(severity, _)| *severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].1.contains("valid position"));
}

#[test]
fn test_fill_waits_for_level_slots() {
    let mut ctl = orchestrator(settings());
    let mut world = garden(10_000, 90_000).with_item("Enchanted Wheat", 15);
    world.composter_mut().unwrap().levels_loaded = false;
    world.open(COMPOSTER_VIEW);
    let start = Instant::now();

    ctl.start(start, Trigger::Manual);
    ctl.main = MainState::Operate;
    ctl.operate = OperateState::Fill;
    tick(&mut ctl, &mut world, start + STEP);
    tick(&mut ctl, &mut world, start + STEP * 2);

    assert!(ctl.is_running());
    assert_eq!(ctl.operate_state(), OperateState::Fill);
    assert_eq!(world.item_count("Enchanted Wheat"), 15);

    world.composter_mut().unwrap().levels_loaded = true;
    tick(&mut ctl, &mut world, start + STEP * 3);

    assert_eq!(ctl.operate_state(), OperateState::Fill);
    assert_eq!(world.item_count("Enchanted Wheat"), 14);
}

#[test]
fn test_fill_finishes_on_unreadable_label() {
    let mut ctl = orchestrator(settings());
    let mut world = garden(10_000, 90_000).with_item("Enchanted Wheat", 15);
    world.composter_mut().unwrap().matter_lore = Some("§cLoading...".to_string());
    world.open(COMPOSTER_VIEW);
    let start = Instant::now();

    ctl.start(start, Trigger::Manual);
    ctl.main = MainState::Operate;
    ctl.operate = OperateState::Fill;
    tick(&mut ctl, &mut world, start + STEP);

    assert_eq!(ctl.operate_state(), OperateState::Done);
    assert_eq!(world.item_count("Enchanted Wheat"), 15);
    assert_eq!(ctl.levels().organic_matter, None);
}

// ─────────────────────────────────────────────────────────
// Stuck detection
// ─────────────────────────────────────────────────────────

#[test]
fn test_stall_in_operate_restarts() {
    let mut ctl = orchestrator(settings());
    let mut world = garden(10_000, 90_000);
    world.stalled_path = Some(COMPOSTER_AT);
    let start = Instant::now();

    ctl.start(start, Trigger::Manual);
    ctl.main = MainState::Operate;
    ctl.operate = OperateState::Orient;
    let window = Duration::from_millis(ctl.watchdog().window_ms());

    tick(&mut ctl, &mut world, start + STEP);
    assert_eq!(ctl.operate_state(), OperateState::Orient);

    tick(&mut ctl, &mut world, start + window - Duration::from_millis(1));
    assert_eq!(ctl.restarts(), 0);

    tick(&mut ctl, &mut world, start + window);
    assert_eq!(ctl.restarts(), 1);
    assert!(ctl.is_running());
    assert_eq!(ctl.main_state(), MainState::Idle);
    assert_eq!(ctl.travel_state(), TravelState::Idle);
    assert_eq!(ctl.operate_state(), OperateState::Idle);
    assert_eq!(ctl.trigger(), Trigger::Manual);
    assert!(matches!(ctl.last_fault(), Some(Fault::Stuck { .. })));

    let actions = ctl.drain_actions();
    let stop = actions
        .iter()
        .position(|action| *action == HostAction::HaltMovement)
        .unwrap();
    let restart = actions
        .iter()
        .rposition(|action| *action == HostAction::PauseMacro)
        .unwrap();
    assert!(stop < restart);
}

#[test]
fn test_running_flow_rearms_watchdog() {
    let mut settings = settings();
    settings.purchase.biofuel.timeout_ms = 60_000;
    let mut ctl = orchestrator(settings);
    let mut world = garden(30_000, 5_000);
    let start = Instant::now();

    ctl.start(start, Trigger::Manual);
    ctl.main = MainState::Operate;
    ctl.operate = OperateState::AwaitPurchase;
    assert!(ctl
        .biofuel
        .start_session(&[PurchaseRequest::new(BIOFUEL, 1)], &world));
    ctl.active = Some(FlowKind::Fuel);

    let mut now = start;
    while now < start + Duration::from_secs(20) {
        now += STEP;
        tick(&mut ctl, &mut world, now);
    }

    assert_eq!(ctl.restarts(), 0);
    assert!(ctl.flow(FlowKind::Fuel).is_running());
    assert!(ctl.watchdog().is_armed());
}

#[test]
fn test_stall_during_end_disarms_watchdog() {
    let mut ctl = orchestrator(settings());
    let mut world = garden(10_000, 90_000);
    let start = Instant::now();

    ctl.start(start, Trigger::Manual);
    ctl.main = MainState::End;
    tick(&mut ctl, &mut world, start + Duration::from_secs(30));

    assert_eq!(ctl.restarts(), 0);
    assert!(!ctl.watchdog().is_armed());
    assert_eq!(world.commands(), &["/warp garden".to_string()]);
}

#[test]
fn test_transitions_rearm_watchdog() {
    let mut ctl = orchestrator(settings());
    let mut world = garden(10_000, 90_000).with_item("Enchanted Wheat", 15);
    let start = Instant::now();
    ctl.start(start, Trigger::Manual);

    // Progressing every few seconds never trips a 7.85 s window
    let mut now = start;
    while ctl.is_running() && now < start + Duration::from_secs(120) {
        now += STEP;
        tick(&mut ctl, &mut world, now);
    }
    assert_eq!(ctl.restarts(), 0);
}

// ─────────────────────────────────────────────────────────
// End sequence and background loop
// ─────────────────────────────────────────────────────────

#[test]
fn test_end_arms_background_loop() {
    let mut settings = settings();
    settings.background_loop.enabled = true;
    settings.background_loop.interval_minutes = 10;
    let mut ctl = orchestrator(settings);
    let mut world = garden(10_000, 90_000);
    let start = Instant::now();

    ctl.start(start, Trigger::Manual);
    ctl.main = MainState::End;
    let finished = run_until_stopped(&mut ctl, &mut world, start);

    assert_eq!(ctl.next_run().duration(), Duration::from_millis(600_000));
    assert_eq!(
        ctl.next_run_remaining(finished),
        Some(Duration::from_millis(600_000))
    );
    assert_eq!(world.commands().len(), 3);
}

#[test]
fn test_zero_interval_clamps_to_one_minute() {
    let mut settings = settings();
    settings.background_loop.enabled = true;
    settings.background_loop.interval_minutes = 0;
    let mut ctl = orchestrator(settings);
    let mut world = garden(10_000, 90_000);
    let start = Instant::now();

    ctl.start(start, Trigger::Manual);
    ctl.main = MainState::End;
    run_until_stopped(&mut ctl, &mut world, start);

    assert_eq!(ctl.next_run().duration(), Duration::from_millis(60_000));
}

#[test]
fn test_huge_interval_schedules_without_overflow() {
    let mut settings = settings();
    settings.background_loop.enabled = true;
    settings.background_loop.interval_minutes = u64::MAX / 1_000;
    let mut ctl = orchestrator(settings);
    let mut world = garden(10_000, 90_000);
    let start = Instant::now();

    ctl.start(start, Trigger::Manual);
    ctl.main = MainState::End;
    let finished = run_until_stopped(&mut ctl, &mut world, start);

    assert!(ctl.next_run().is_armed());
    assert!(!ctl.next_run().passed(finished + Duration::from_secs(3_600)));
    assert!(!ctl.poll_background(&world.snapshot(finished + STEP)));
}

#[test]
fn test_loop_disabled_leaves_next_run_unarmed() {
    let mut ctl = orchestrator(settings());
    let mut world = garden(10_000, 90_000);
    let start = Instant::now();

    ctl.start(start, Trigger::Manual);
    ctl.main = MainState::End;
    let finished = run_until_stopped(&mut ctl, &mut world, start);

    assert!(ctl.next_run_remaining(finished).is_none());
}

#[test]
fn test_background_loop_starts_periodic_run() {
    let mut settings = settings();
    settings.background_loop.enabled = true;
    settings.background_loop.interval_minutes = 1;
    let mut ctl = orchestrator(settings);
    let mut world = garden(10_000, 90_000);
    let start = Instant::now();

    ctl.start(start, Trigger::Manual);
    ctl.main = MainState::End;
    let finished = run_until_stopped(&mut ctl, &mut world, start);

    assert!(!ctl.poll_background(&world.snapshot(finished + Duration::from_secs(30))));
    assert!(ctl.poll_background(&world.snapshot(finished + Duration::from_secs(60))));
    assert!(ctl.is_running());
    assert_eq!(ctl.trigger(), Trigger::Periodic);
    assert!(!ctl.next_run().is_armed());
}

#[test]
fn test_refused_periodic_run_is_rescheduled() {
    let mut settings = settings();
    settings.background_loop.enabled = true;
    settings.background_loop.interval_minutes = 1;
    let mut ctl = orchestrator(settings);
    // Both levels above their thresholds
    let mut world = garden(30_000, 90_000);
    let start = Instant::now();

    ctl.start(start, Trigger::Manual);
    ctl.main = MainState::End;
    let finished = run_until_stopped(&mut ctl, &mut world, start);
    ctl.drain_actions();

    let due = finished + Duration::from_secs(60);
    assert!(!ctl.poll_background(&world.snapshot(due)));
    assert!(!ctl.is_running());
    assert_eq!(
        ctl.next_run_remaining(due),
        Some(Duration::from_millis(60_000))
    );
    assert!(notices(&ctl.drain_actions())
        .iter()
        .any(|(severity, _)| *severity == Severity::Warning));
}

// ─────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────

#[test]
fn test_stop_is_idempotent_from_any_phase() {
    let mut ctl = orchestrator(settings());
    let mut world = garden(30_000, 5_000).with_skymart();
    let start = Instant::now();
    ctl.start(start, Trigger::Manual);

    // Run far enough to be inside the purchase flow
    let mut now = start;
    while ctl.active_flow().is_none() && now < start + Duration::from_secs(60) {
        now += STEP;
        tick(&mut ctl, &mut world, now);
    }
    assert_eq!(ctl.active_flow(), Some(FlowKind::Fuel));

    ctl.stop();
    assert_fully_idle(&ctl);
    let first = ctl.drain_actions();
    assert!(first.contains(&HostAction::HaltMovement));

    ctl.stop();
    assert_fully_idle(&ctl);
    assert!(ctl.drain_actions().is_empty());

    // Ticks after stop do nothing
    tick(&mut ctl, &mut world, now + Duration::from_secs(10));
    assert_fully_idle(&ctl);
}

#[test]
fn test_start_while_running_is_rejected() {
    let mut ctl = orchestrator(settings());
    let mut world = garden(10_000, 90_000);
    let start = Instant::now();

    assert!(ctl.start(start, Trigger::Manual));
    tick(&mut ctl, &mut world, start + STEP);
    tick(&mut ctl, &mut world, start + Duration::from_secs(2));
    let main = ctl.main_state();
    let travel = ctl.travel_state();

    assert!(!ctl.start(start + Duration::from_secs(3), Trigger::Periodic));
    assert_eq!(ctl.main_state(), main);
    assert_eq!(ctl.travel_state(), travel);
    assert_eq!(ctl.trigger(), Trigger::Manual);
}

#[test]
fn test_can_start_reports_reasons() {
    let mut ctl = orchestrator(Settings::default());
    let world = garden(10_000, 90_000);
    let now = Instant::now();

    // Toggled off: refused quietly
    assert!(!ctl.can_start(&world.snapshot(now), true));
    assert!(ctl.drain_actions().is_empty());

    ctl.set_toggled(true);
    let mut snapshot = world.snapshot(now);
    snapshot.server_closing_secs = Some(45);
    assert!(!ctl.can_start(&snapshot, true));
    assert_eq!(ctl.last_fault(), Some(&Fault::ServerClosing { seconds: 45 }));
    assert_eq!(notices(&ctl.drain_actions())[0].0, Severity::Error);

    assert!(ctl.can_start(&world.snapshot(now), false));
}

#[test]
fn test_server_closing_stops_run() {
    let mut ctl = orchestrator(settings());
    let mut world = garden(10_000, 90_000);
    let start = Instant::now();
    ctl.start(start, Trigger::Manual);

    let mut snapshot = world.snapshot(start + STEP);
    snapshot.server_closing_secs = Some(10);
    ctl.tick(&snapshot, &mut world);

    assert_fully_idle(&ctl);
    assert_eq!(ctl.last_fault(), Some(&Fault::ServerClosing { seconds: 10 }));
}

#[test]
fn test_tick_waits_outside_garden() {
    let mut ctl = orchestrator(settings());
    let mut world = garden(10_000, 90_000);
    let start = Instant::now();
    ctl.start(start, Trigger::Manual);

    let mut snapshot = world.snapshot(start + STEP);
    snapshot.in_garden = false;
    ctl.tick(&snapshot, &mut world);

    assert!(!ctl.delay().is_armed());
    assert!(ctl.is_running());
}

#[test]
fn test_toggle_off_stops_run() {
    let mut ctl = orchestrator(settings());
    ctl.start(Instant::now(), Trigger::Manual);
    ctl.set_toggled(false);
    assert_fully_idle(&ctl);
    assert!(!ctl.is_toggled());
}

#[test]
fn test_failsafe_gating() {
    let mut ctl = orchestrator(settings());
    assert!(ctl.should_check_for_failsafes());

    ctl.travel = TravelState::AwaitTeleport;
    assert!(!ctl.should_check_for_failsafes());

    ctl.travel = TravelState::Idle;
    ctl.main = MainState::End;
    assert!(!ctl.should_check_for_failsafes());
}

#[test]
fn test_pause_other_work_while_running() {
    let mut ctl = orchestrator(settings());
    assert!(!ctl.should_pause_other_work());
    ctl.start(Instant::now(), Trigger::Manual);
    assert!(ctl.should_pause_other_work());
    ctl.stop();
    assert!(!ctl.should_pause_other_work());
}

#[test]
fn test_arm_background_requires_loop() {
    let mut ctl = orchestrator(settings());
    let world = garden(10_000, 90_000);
    let now = Instant::now();
    assert!(!ctl.arm_background(now));
    assert!(!ctl.poll_background(&world.snapshot(now)));

    let mut looped = settings();
    looped.background_loop.enabled = true;
    let mut ctl = orchestrator(looped);
    assert!(ctl.arm_background(now));
    assert!(ctl.poll_background(&world.snapshot(now)));
    assert_eq!(ctl.trigger(), Trigger::Periodic);
}
