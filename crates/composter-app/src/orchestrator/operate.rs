//! Operate phase: open the composter, buy what is missing, feed it

use std::time::Instant;

use composter_core::prelude::*;
use composter_core::{needs, parse_lore, resource, ClickType, ResourceLevel, Severity, Slot, Vec3};

use super::watchdog::INTERACT_WINDOW_MS;
use super::{ComposterLevels, MainState, OperateState, Orchestrator, TravelState};
use crate::action::HostAction;
use crate::purchase::{FlowKind, PurchaseRequest, BIOFUEL, BOX_OF_SEEDS};
use crate::world::{World, WorldSnapshot};

/// Title of the composter view
pub const COMPOSTER_VIEW: &str = "Composter";

/// Container slot whose lore shows organic matter
pub const MATTER_SLOT: usize = 37;

/// Container slot whose lore shows fuel
pub const FUEL_SLOT: usize = 43;

/// Farther than this from the composter means walking back
const REACH: f64 = 3.0;

/// Pause between reading the levels and the first feed click
const INSPECT_SETTLE_MS: u64 = 300;

/// Pause between the last feed click and the end sequence
const END_SETTLE_MS: u64 = 1_800;

// ─────────────────────────────────────────────────────────────────────────────
// Flow selection
// ─────────────────────────────────────────────────────────────────────────────

/// Flows that may be delegated to right now (enabled and not yet tried)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowAvailability {
    pub fuel: bool,
    pub matter: bool,
    pub shopping: bool,
}

/// Pick the purchase flow for the current shortages.
///
/// Both short with the shopping flow available buys both in one trip;
/// otherwise fuel comes before organic matter, and the shopping flow covers
/// whichever single item has no flow of its own.
pub fn choose_flow(
    matter_short: bool,
    fuel_short: bool,
    available: FlowAvailability,
) -> Option<FlowKind> {
    if matter_short && fuel_short && available.shopping {
        return Some(FlowKind::Shopping);
    }
    if fuel_short && available.fuel {
        return Some(FlowKind::Fuel);
    }
    if matter_short && available.matter {
        return Some(FlowKind::Matter);
    }
    if (matter_short || fuel_short) && available.shopping {
        return Some(FlowKind::Shopping);
    }
    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

pub(super) fn handle_pre_operate(ctl: &mut Orchestrator, now: Instant) {
    info!("[Composter] Requesting auto-sell before filling");
    ctl.actions.push(HostAction::StartAutoSell);
    ctl.set_main(now, MainState::Operate);
    let ms = ctl.pacing.short();
    ctl.delay_ms(now, ms);
}

pub(super) fn handle_operate(
    ctl: &mut Orchestrator,
    snapshot: &WorldSnapshot,
    world: &mut dyn World,
) {
    let now = snapshot.now;
    if snapshot.auxiliary_sell_running {
        ctl.watchdog.arm(now);
        let ms = ctl.pacing.short();
        ctl.delay_ms(now, ms);
        return;
    }

    match ctl.operate {
        OperateState::Idle => ctl.set_operate(now, OperateState::Orient),
        OperateState::Orient => handle_orient(ctl, now, world),
        OperateState::OpenTarget => handle_open_target(ctl, snapshot, world),
        OperateState::Inspect => handle_inspect(ctl, now, world),
        OperateState::AwaitPurchase => handle_await_purchase(ctl, now, world),
        OperateState::Fill => handle_fill(ctl, now, world),
        OperateState::Done => {
            ctl.set_main(now, MainState::End);
            ctl.set_operate(now, OperateState::Idle);
            ctl.delay_ms(now, END_SETTLE_MS);
        }
    }
}

fn handle_orient(ctl: &mut Orchestrator, now: Instant, world: &mut dyn World) {
    if world.open_view().is_some() {
        world.stop_movement();
        world.close_view();
        let ms = ctl.pacing.short();
        ctl.delay_ms(now, ms);
        return;
    }

    let Some(entity) = target_entity(ctl, world) else {
        search_again(ctl, now);
        return;
    };
    world.face(entity);
    if world.is_pathing() {
        return;
    }
    ctl.set_operate(now, OperateState::OpenTarget);
}

fn handle_open_target(ctl: &mut Orchestrator, snapshot: &WorldSnapshot, world: &mut dyn World) {
    let now = snapshot.now;
    if world.open_view().is_some() {
        world.close_view();
        let ms = ctl.pacing.short();
        ctl.delay_ms(now, ms);
        return;
    }

    if world.is_target_in_crosshair() {
        world.interact();
        let next = if ctl.inspected {
            OperateState::Fill
        } else {
            OperateState::Inspect
        };
        ctl.set_operate(now, next);
        ctl.watchdog.arm_for(now, INTERACT_WINDOW_MS);
        let ms = ctl.pacing.between(600, 1_000);
        ctl.delay_ms(now, ms);
        return;
    }

    if world.is_rotating() {
        return;
    }
    let Some(entity) = target_entity(ctl, world) else {
        search_again(ctl, now);
        return;
    };
    let far = snapshot
        .player_position
        .is_some_and(|player| player.distance(entity) > REACH);
    if far {
        debug!("[Composter] Too far from the composter, travelling back");
        ctl.set_main(now, MainState::Travel);
        ctl.set_operate(now, OperateState::Idle);
    } else {
        world.face(entity);
        world.step_toward(entity);
    }
    let ms = ctl.pacing.between(1_000, 1_500);
    ctl.delay_ms(now, ms);
}

fn handle_inspect(ctl: &mut Orchestrator, now: Instant, world: &mut dyn World) {
    if !ensure_composter_view(ctl, now, world) {
        return;
    }

    let Some(levels) = read_levels(world) else {
        return;
    };
    ctl.levels = levels;
    debug!(
        "[Composter] Organic Matter: {}, Fuel: {}",
        resource::describe(levels.organic_matter),
        resource::describe(levels.fuel)
    );
    let (Some(matter), Some(fuel)) = (levels.organic_matter, levels.fuel) else {
        return;
    };

    if let Some((kind, requests)) = plan_purchase(ctl, matter, fuel, world) {
        ctl.attempted.insert(kind);
        if ctl.flow_mut(kind).start_session(&requests, world) {
            info!("[Composter] Nothing to feed, starting {} purchase", kind);
            ctl.active = Some(kind);
            ctl.set_operate(now, OperateState::AwaitPurchase);
            let ms = ctl.pacing.gui_delay();
            ctl.delay_ms(now, ms);
            return;
        }
        warn!("[Composter] {} purchase did not start", kind);
    }

    ctl.inspected = true;
    ctl.set_operate(now, OperateState::Fill);
    ctl.delay_ms(now, INSPECT_SETTLE_MS);
}

fn handle_await_purchase(ctl: &mut Orchestrator, now: Instant, world: &mut dyn World) {
    let Some(kind) = ctl.active else {
        ctl.set_operate(now, OperateState::Inspect);
        return;
    };
    if !ctl.flow_mut(kind).tick(now, world) {
        return;
    }

    ctl.active = None;
    let flow = ctl.flow(kind);
    let summary = flow
        .results()
        .iter()
        .map(|result| format!("{} {}/{}", result.item, result.obtained, result.requested))
        .collect::<Vec<_>>()
        .join(", ");
    if flow.has_succeeded() {
        info!("[Composter] {} purchase finished: {}", kind, summary);
    } else {
        ctl.notify(
            Severity::Warning,
            format!("{} purchase did not complete: {}", kind, summary),
        );
    }

    ctl.set_operate(now, OperateState::Inspect);
    let ms = ctl.pacing.gui_delay();
    ctl.delay_ms(now, ms);
}

fn handle_fill(ctl: &mut Orchestrator, now: Instant, world: &mut dyn World) {
    if !ensure_composter_view(ctl, now, world) {
        return;
    }

    // Level slots still loading: look again next tick
    let Some(levels) = read_levels(world) else {
        return;
    };
    ctl.levels = levels;

    let mut fed = false;
    if needs(levels.organic_matter, ctl.settings.composter.organic_matter_left) {
        fed = feed_organic_matter(ctl, now, world);
    }
    if !fed && needs(levels.fuel, ctl.settings.composter.fuel_left) {
        fed = feed_fuel(ctl, now, world);
    }

    if fed {
        ctl.watchdog.arm(now);
        return;
    }

    ctl.notify(
        Severity::Warning,
        "Targets met or no matching items found. Finishing.",
    );
    if ctl.settings.composter.log_events {
        ctl.webhook("Auto Composter: Finished (targets met or no items to feed).");
    }
    ctl.set_operate(now, OperateState::Done);
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Composter position from the cache, looked up again when unknown
fn target_entity(ctl: &mut Orchestrator, world: &dyn World) -> Option<Vec3> {
    if let Some(entity) = ctl.target.entity() {
        return Some(entity);
    }
    let entity = world.locate_target()?;
    ctl.target.remember_entity(entity);
    Some(entity)
}

/// Lost the composter: go back to searching for it
fn search_again(ctl: &mut Orchestrator, now: Instant) {
    warn!("[Composter] Composter lost, searching again");
    ctl.target.forget_entity();
    ctl.set_main(now, MainState::Travel);
    ctl.set_travel(now, TravelState::Locate);
    ctl.set_operate(now, OperateState::Idle);
}

/// True when the composter view is open; otherwise steers back to it
fn ensure_composter_view(ctl: &mut Orchestrator, now: Instant, world: &mut dyn World) -> bool {
    let Some(view) = world.open_view() else {
        ctl.set_operate(now, OperateState::OpenTarget);
        return false;
    };
    if ctl
        .settings
        .composter
        .view_matching
        .matches(Some(view.as_str()), &[COMPOSTER_VIEW])
    {
        return true;
    }

    debug!("[Composter] Unexpected view '{}', closing", view);
    world.close_view();
    ctl.set_operate(now, OperateState::Orient);
    let ms = ctl.pacing.between(400, 800);
    ctl.delay_ms(now, ms);
    ctl.watchdog.arm_for(now, INTERACT_WINDOW_MS);
    false
}

/// Both levels from the open composter view; `None` until both slots exist.
/// A present slot with an unreadable label yields an unknown level.
fn read_levels(world: &dyn World) -> Option<ComposterLevels> {
    let matter = world.slot(MATTER_SLOT)?;
    let fuel = world.slot(FUEL_SLOT)?;
    Some(ComposterLevels {
        organic_matter: read_level(&matter),
        fuel: read_level(&fuel),
    })
}

fn read_level(slot: &Slot) -> Option<ResourceLevel> {
    let level = parse_lore(&slot.lore);
    if level.is_none() {
        let fault = Fault::ParseFailure {
            text: slot.lore.join(" | "),
        };
        warn!("[Composter] {}: {}", slot.name, fault);
    }
    level
}

/// Decide which flow to run and what it should buy
fn plan_purchase(
    ctl: &Orchestrator,
    matter: ResourceLevel,
    fuel: ResourceLevel,
    world: &dyn World,
) -> Option<(FlowKind, Vec<PurchaseRequest>)> {
    let composter = &ctl.settings.composter;

    // Organic matter is only bought as Box of Seeds, which must be allowed as feed
    let matter_short = composter.use_box_of_seeds
        && matter.is_below(composter.organic_matter_left)
        && !has_organic_matter(ctl, world);
    let fuel_short = fuel.is_below(composter.fuel_left) && world.item_count(BIOFUEL) == 0;

    let available = FlowAvailability {
        fuel: ctl.biofuel.is_enabled() && !ctl.attempted.contains(&FlowKind::Fuel),
        matter: ctl.seeds.is_enabled() && !ctl.attempted.contains(&FlowKind::Matter),
        shopping: ctl.shopping.is_enabled() && !ctl.attempted.contains(&FlowKind::Shopping),
    };
    let kind = choose_flow(matter_short, fuel_short, available)?;

    let purchase = &ctl.settings.purchase;
    let fuel_request = PurchaseRequest::new(BIOFUEL, purchase.biofuel.batch);
    let matter_request = PurchaseRequest::new(BOX_OF_SEEDS, purchase.box_of_seeds.batch);
    let requests = match kind {
        FlowKind::Fuel => vec![fuel_request],
        FlowKind::Matter => vec![matter_request],
        FlowKind::Shopping => {
            let mut requests = Vec::new();
            if fuel_short {
                requests.push(fuel_request);
            }
            if matter_short {
                requests.push(matter_request);
            }
            requests
        }
    };
    Some((kind, requests))
}

/// Any enabled organic matter (or allowed Box of Seeds) in the inventory
fn has_organic_matter(ctl: &Orchestrator, world: &dyn World) -> bool {
    let composter = &ctl.settings.composter;
    composter
        .preferred_organic_matter()
        .into_iter()
        .any(|name| world.item_count(name) > 0)
        || (composter.use_box_of_seeds && world.item_count(BOX_OF_SEEDS) > 0)
}

fn feed_organic_matter(ctl: &mut Orchestrator, now: Instant, world: &mut dyn World) -> bool {
    let delay = ctl.settings.composter.click_delay_ms;
    for name in ctl.settings.composter.preferred_organic_matter() {
        if let Some(slot) = world.find_slot(name) {
            debug!("[Composter] Using {}", name);
            world.click_slot(slot.index, ClickType::Left);
            ctl.delay_ms(now, delay);
            return true;
        }
    }

    if ctl.settings.composter.use_box_of_seeds {
        if let Some(slot) = world.find_slot(BOX_OF_SEEDS) {
            debug!("[Composter] Using {}", BOX_OF_SEEDS);
            world.click_slot(slot.index, ClickType::Left);
            ctl.delay_ms(now, delay);
            return true;
        }
    }
    false
}

fn feed_fuel(ctl: &mut Orchestrator, now: Instant, world: &mut dyn World) -> bool {
    let Some(slot) = world.find_slot(BIOFUEL) else {
        return false;
    };
    debug!("[Composter] Feeding {}", BIOFUEL);
    world.click_slot(slot.index, ClickType::Left);
    let delay = ctl.settings.composter.fuel_click_delay_ms;
    ctl.delay_ms(now, delay);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: FlowAvailability = FlowAvailability {
        fuel: true,
        matter: true,
        shopping: true,
    };

    #[test]
    fn test_nothing_short_buys_nothing() {
        assert_eq!(choose_flow(false, false, ALL), None);
    }

    #[test]
    fn test_both_short_prefers_shopping() {
        assert_eq!(choose_flow(true, true, ALL), Some(FlowKind::Shopping));

        let no_shopping = FlowAvailability {
            shopping: false,
            ..ALL
        };
        assert_eq!(choose_flow(true, true, no_shopping), Some(FlowKind::Fuel));
    }

    #[test]
    fn test_single_shortage_uses_its_own_flow() {
        assert_eq!(choose_flow(false, true, ALL), Some(FlowKind::Fuel));
        assert_eq!(choose_flow(true, false, ALL), Some(FlowKind::Matter));
    }

    #[test]
    fn test_shopping_covers_missing_flow() {
        let only_shopping = FlowAvailability {
            fuel: false,
            matter: false,
            shopping: true,
        };
        assert_eq!(choose_flow(false, true, only_shopping), Some(FlowKind::Shopping));
        assert_eq!(
            choose_flow(false, true, FlowAvailability::default()),
            None
        );
    }
}
