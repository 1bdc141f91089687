//! Travel phase: get next to the composter

use std::time::Instant;

use composter_core::prelude::*;
use composter_core::{Severity, Vec3};

use super::watchdog::TRAVEL_WINDOW_MS;
use super::{MainState, Orchestrator, TravelState};
use crate::world::{World, WorldSnapshot};

/// Squared distance under which the player counts as arrived (or not moved)
const ARRIVED_DISTANCE_SQ: f64 = 3.0;

/// Search radius for a standing point around the composter
const STANDABLE_RADIUS: f64 = 1.75;

pub(super) fn handle_travel(
    ctl: &mut Orchestrator,
    snapshot: &WorldSnapshot,
    world: &mut dyn World,
) {
    let now = snapshot.now;
    if world.open_view().is_some() {
        world.stop_movement();
        world.close_view();
        let ms = ctl.pacing.short();
        ctl.delay_ms(now, ms);
        return;
    }

    let Some(player) = snapshot.player_position else {
        return;
    };

    match ctl.travel {
        TravelState::Idle => handle_idle(ctl, now, snapshot.in_staging_area),
        TravelState::RequestTeleport => handle_request_teleport(ctl, now, player, world),
        TravelState::AwaitTeleport => handle_await_teleport(ctl, now, player, snapshot.suffocating),
        TravelState::Approach => handle_approach(ctl, now, player, world),
        TravelState::Locate => handle_locate(ctl, now, world),
        TravelState::Arrived => handle_arrived(ctl, now, world),
    }
}

fn handle_idle(ctl: &mut Orchestrator, now: Instant, in_staging_area: bool) {
    if in_staging_area {
        ctl.set_travel(now, TravelState::Approach);
        ctl.watchdog.arm_for(now, TRAVEL_WINDOW_MS);
    } else {
        ctl.set_travel(now, TravelState::RequestTeleport);
    }
}

fn handle_request_teleport(ctl: &mut Orchestrator, now: Instant, player: Vec3, world: &mut dyn World) {
    ctl.position_before_tp = Some(player);
    ctl.set_travel(now, TravelState::AwaitTeleport);

    let command = ctl.settings.composter.commands.teleport.clone();
    world.send_command(&command);

    let ms = ctl.pacing.between(600, 1_100);
    ctl.delay_ms(now, ms);
}

fn handle_await_teleport(ctl: &mut Orchestrator, now: Instant, player: Vec3, suffocating: bool) {
    let moved = ctl
        .position_before_tp
        .map_or(true, |origin| player.distance_sq(origin) >= ARRIVED_DISTANCE_SQ);
    if !moved || suffocating {
        debug!("[Composter] Waiting for teleportation...");
        return;
    }

    ctl.set_travel(now, TravelState::Approach);
    let ms = ctl.pacing.between(600, 1_100);
    ctl.delay_ms(now, ms);
}

fn handle_approach(ctl: &mut Orchestrator, now: Instant, player: Vec3, world: &mut dyn World) {
    let Some(point) = ctl.target.standing_point() else {
        ctl.set_travel(now, TravelState::Locate);
        ctl.watchdog.arm_for(now, TRAVEL_WINDOW_MS);
        return;
    };

    if player.distance_sq(point) >= ARRIVED_DISTANCE_SQ {
        let method = ctl.settings.composter.travel_method;
        debug!("[Composter] Travelling to {} ({})", point, method);
        world.path_to(point, method);
    }
    ctl.set_travel(now, TravelState::Arrived);
}

fn handle_locate(ctl: &mut Orchestrator, now: Instant, world: &mut dyn World) {
    let Some(entity) = world.locate_target() else {
        if !world.is_pathing() {
            let [x, y, z] = ctl.settings.composter.search_origin;
            world.path_to(Vec3::block_center(x, y, z), ctl.settings.composter.travel_method);
        }
        debug!("[Composter] Composter not found! Looking for it.");
        return;
    };

    let Some(point) = world.closest_standable(entity, STANDABLE_RADIUS) else {
        ctl.notify(
            Severity::Error,
            "Can't find a valid position around the Composter!",
        );
        ctl.target.forget();
        ctl.set_main(now, MainState::End);
        return;
    };

    world.stop_movement();
    ctl.target.remember(entity, point);
    ctl.notify(Severity::Success, format!("Found Composter! {}", entity));

    ctl.set_travel(now, TravelState::Approach);
    let ms = ctl.pacing.between(300, 600);
    ctl.delay_ms(now, ms);
    ctl.watchdog.arm_for(now, TRAVEL_WINDOW_MS);
}

fn handle_arrived(ctl: &mut Orchestrator, now: Instant, world: &mut dyn World) {
    if world.is_pathing() {
        return;
    }
    world.stop_movement();

    let next = if ctl.settings.composter.auto_sell_before_filling {
        MainState::PreOperateStep
    } else {
        MainState::Operate
    };
    ctl.set_main(now, next);
    ctl.set_travel(now, TravelState::Idle);
}
