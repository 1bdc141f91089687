//! Synchronous driver: one orchestrator, one simulated garden, a virtual clock

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use composter_app::{
    MainState, OperateState, Orchestrator, Pacing, Settings, TravelState, Trigger, World,
};

use super::HeadlessEvent;
use crate::sim::SimWorld;

/// Outcome of a simulation, reported with the `finished` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationSummary {
    pub ticks: u64,
    pub restarts: u32,
    pub organic_matter: u64,
    pub fuel: u64,
    pub purse: u64,
    pub commands_sent: usize,
}

/// Phase tuple used to detect state changes worth reporting
type Phases = (MainState, TravelState, OperateState, Option<String>);

pub struct Simulation {
    ctl: Orchestrator,
    world: SimWorld,
    started_at: Instant,
    tick_ms: u64,
    ticks: u64,
    last_phases: Option<Phases>,
}

impl Simulation {
    pub fn new(settings: Settings, world: SimWorld, seed: u64, tick_ms: u64) -> Self {
        let pacing = Pacing::seeded(settings.gui.clone(), seed);
        Self {
            ctl: Orchestrator::new(settings, pacing),
            world,
            started_at: Instant::now(),
            tick_ms: tick_ms.max(1),
            ticks: 0,
            last_phases: None,
        }
    }

    pub fn controller(&self) -> &Orchestrator {
        &self.ctl
    }

    pub fn controller_mut(&mut self) -> &mut Orchestrator {
        &mut self.ctl
    }

    pub fn world(&self) -> &SimWorld {
        &self.world
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Virtual time of the current tick
    pub fn now(&self) -> Instant {
        self.started_at + Duration::from_millis(self.ticks.saturating_mul(self.tick_ms))
    }

    /// Kick things off: a manual run, or arm the background loop
    pub fn begin(&mut self, manual: bool) -> Vec<HeadlessEvent> {
        let now = self.now();
        self.world.advance(now);
        let snapshot = self.world.snapshot(now);

        let mut events = Vec::new();
        if manual {
            if self.ctl.can_start(&snapshot, true) && self.ctl.start(now, Trigger::Manual) {
                events.push(HeadlessEvent::run_started(Trigger::Manual, self.ticks));
            }
        } else if self.ctl.arm_background(now) {
            info!("Background loop armed");
        } else {
            warn!("Background loop is disabled and no manual run was requested");
        }

        events.extend(self.drain_events());
        events
    }

    /// Advance the clock by one tick and run the controller once
    pub fn step(&mut self) -> Vec<HeadlessEvent> {
        self.ticks += 1;
        let now = self.now();
        self.world.advance(now);
        let snapshot = self.world.snapshot(now);

        let mut events = Vec::new();
        if self.ctl.poll_background(&snapshot) {
            events.push(HeadlessEvent::run_started(Trigger::Periodic, self.ticks));
        }
        self.ctl.tick(&snapshot, &mut self.world);

        events.extend(self.drain_events());
        events
    }

    /// Stop the controller and flush what it queued
    pub fn shutdown(&mut self) -> Vec<HeadlessEvent> {
        self.ctl.stop();
        self.drain_events()
    }

    /// Nothing running and nothing scheduled
    pub fn is_settled(&self) -> bool {
        !self.ctl.is_running() && !self.ctl.next_run().is_armed()
    }

    pub fn summary(&self) -> SimulationSummary {
        SimulationSummary {
            ticks: self.ticks,
            restarts: self.ctl.restarts(),
            organic_matter: self.world.matter().current,
            fuel: self.world.fuel().current,
            purse: self.world.purse(),
            commands_sent: self.world.commands().len(),
        }
    }

    /// Item count in the simulated inventory
    pub fn item_count(&self, name: &str) -> u32 {
        self.world.item_count(name)
    }

    fn drain_events(&mut self) -> Vec<HeadlessEvent> {
        let tick = self.ticks;
        let mut events: Vec<HeadlessEvent> = self
            .ctl
            .drain_actions()
            .into_iter()
            .map(|action| HeadlessEvent::from_action(action, tick))
            .collect();

        let status = self.ctl.status(self.now());
        let phases = (
            status.main,
            status.travel,
            status.operate,
            status.purchase.clone(),
        );
        if self.last_phases.as_ref() != Some(&phases) {
            self.last_phases = Some(phases);
            events.push(HeadlessEvent::status(tick, status));
        }
        events
    }
}
