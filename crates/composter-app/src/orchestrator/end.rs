//! End phase: command sequence, background rescheduling and hand-back

use std::time::Instant;

use composter_core::prelude::*;

use super::{Orchestrator, Trigger};
use crate::action::HostAction;
use crate::world::World;

pub(super) fn handle_end(ctl: &mut Orchestrator, now: Instant, world: &mut dyn World) {
    if world.open_view().is_some() {
        world.close_view();
        let ms = ctl.pacing.between(1_000, 1_500);
        ctl.delay_ms(now, ms);
        return;
    }

    let next = ctl
        .settings
        .composter
        .commands
        .end_sequence
        .get(ctl.end_step)
        .cloned();
    if let Some(command) = next {
        debug!("[Composter] End sequence step {}: {}", ctl.end_step, command);
        world.send_command(&command);
        ctl.end_step += 1;
        let gap = ctl.pacing.command_gap();
        ctl.delay_ms(now, gap);
        return;
    }

    finish(ctl, now);
}

fn finish(ctl: &mut Orchestrator, now: Instant) {
    ctl.end_step = 0;

    let background = &ctl.settings.background_loop;
    if background.enabled {
        let interval_ms = background.interval_ms();
        info!(
            "[Composter] Scheduled next run in {} minutes",
            background.interval_minutes.max(1)
        );
        ctl.next_run.schedule_ms(now, interval_ms);
    }

    if ctl.settings.composter.log_events {
        ctl.webhook("Auto Composter finished");
    }

    let trigger = ctl.trigger;
    ctl.stop();
    if trigger == Trigger::Periodic {
        ctl.actions.push(HostAction::ResumeMacro);
    }
}
