//! Shopping-list purchase flow
//!
//! Buys several items in one trip through the shop. Each item is bought and
//! verified against its own inventory delta before the next one starts.
//! Items that are missing or under-delivered go to a retry queue that is
//! replayed for a bounded number of passes; whatever is still short after
//! that is reported, not fatal.

use std::collections::VecDeque;
use std::time::Instant;

use composter_core::prelude::*;
use composter_core::{ClickType, RetryCounter};

use super::engine::{DebugLevel, FlowCore, FlowTiming};
use super::{ItemResult, PurchaseFlow, PurchaseRequest, PurchaseState, BIOFUEL, BOX_OF_SEEDS};
use crate::config::Settings;
use crate::pacing::Pacing;
use crate::world::{find_any, World};

/// Pause after skipping an item that is not in the shop
const SKIP_DELAY_MS: u64 = 500;

/// Item bought this step and waiting for verification
#[derive(Debug, Clone)]
struct Pending {
    item: String,
    wanted: u32,
    pre_count: u32,
}

#[derive(Debug)]
pub struct ShoppingBuyer {
    core: FlowCore,
    enabled: bool,
    queue: VecDeque<PurchaseRequest>,
    retry_queue: Vec<PurchaseRequest>,
    results: Vec<ItemResult>,
    pending: Option<Pending>,
    passes: RetryCounter,
    purchase_delay_ms: u64,
    retry_delay_ms: u64,
}

impl ShoppingBuyer {
    pub fn new(settings: &Settings, pacing: Pacing) -> Self {
        let flow = &settings.purchase.shopping;
        let core = FlowCore::new(
            "ShoppingBuyer",
            settings.purchase.menu.clone(),
            settings.composter.view_matching,
            FlowTiming {
                timeout_ms: flow.timeout_ms,
                extra_delay_ms: 0,
            },
            DebugLevel::new(flow.debug_level),
            pacing,
        );
        Self {
            core,
            enabled: flow.enabled,
            queue: VecDeque::new(),
            retry_queue: Vec::new(),
            results: Vec::new(),
            pending: None,
            passes: RetryCounter::new(flow.max_retries),
            purchase_delay_ms: flow.purchase_delay_ms,
            retry_delay_ms: flow.retry_delay_ms,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.core.fault()
    }

    /// Missing quantity per item; only items that are short are listed
    pub fn shortfalls(&self) -> Vec<(String, u32)> {
        self.results
            .iter()
            .filter(|result| !result.is_satisfied())
            .map(|result| (result.item.clone(), result.shortfall()))
            .collect()
    }

    /// Retry passes used in the current or last session
    pub fn passes_used(&self) -> u32 {
        self.passes.attempts()
    }

    fn result_mut(&mut self, item: &str) -> Option<&mut ItemResult> {
        self.results.iter_mut().find(|result| result.item == item)
    }

    // ─────────────────────────────────────────────────────────────
    // Steps
    // ─────────────────────────────────────────────────────────────

    fn select_item(&mut self, now: Instant, world: &mut dyn World) {
        let Some(request) = self.queue.pop_front() else {
            self.next_pass(now);
            return;
        };

        let pre_count = world.item_count(&request.item);
        let names = alternate_names(&request.item);

        let Some(slot) = find_any(world, &names) else {
            warn!(
                "[{}] Cannot find '{}' in the shop, will retry",
                self.core.label(),
                request.item
            );
            self.retry_queue.push(request);
            self.core.delay_ms(now, SKIP_DELAY_MS);
            return;
        };

        for _ in 0..request.quantity {
            self.core.click(world, &slot, ClickType::QuickMove);
        }
        self.pending = Some(Pending {
            item: request.item,
            wanted: request.quantity,
            pre_count,
        });
        self.core.transition(PurchaseState::Verify);
        self.core.delay_ms(now, self.purchase_delay_ms);
    }

    /// Queue exhausted: replay the retry queue or finish
    fn next_pass(&mut self, now: Instant) {
        if self.retry_queue.is_empty() {
            self.core.transition(PurchaseState::Done);
            return;
        }

        if self.passes.try_consume() {
            debug!(
                "[{}] Retrying {} item(s), pass {}/{}",
                self.core.label(),
                self.retry_queue.len(),
                self.passes.attempts(),
                self.passes.ceiling()
            );
            self.queue.extend(self.retry_queue.drain(..));
            self.core.delay_ms(now, self.retry_delay_ms);
        } else {
            for (item, missing) in self.shortfalls() {
                warn!(
                    "[{}] Gave up on {}: {} still missing",
                    self.core.label(),
                    item,
                    missing
                );
            }
            self.retry_queue.clear();
            self.core.transition(PurchaseState::Done);
        }
    }

    fn verify(&mut self, now: Instant, world: &mut dyn World) {
        let Some(pending) = self.pending.take() else {
            self.core.transition(PurchaseState::SelectItem);
            return;
        };

        let gained = world
            .item_count(&pending.item)
            .saturating_sub(pending.pre_count);
        if let Some(result) = self.result_mut(&pending.item) {
            result.obtained += gained;
        }

        if gained >= pending.wanted {
            debug!(
                "[{}] Got {} {} (wanted {})",
                self.core.label(),
                gained,
                pending.item,
                pending.wanted
            );
        } else {
            let fault = Fault::VerificationShortfall {
                item: pending.item.clone(),
                requested: pending.wanted,
                gained,
            };
            warn!("[{}] {}", self.core.label(), fault);
            self.retry_queue
                .push(PurchaseRequest::new(pending.item, pending.wanted - gained));
        }

        self.core.transition(PurchaseState::SelectItem);
        self.core.gui_delay(now);
    }
}

/// Names to try for a shop entry, primary first
fn alternate_names(item: &str) -> Vec<String> {
    let mut names = vec![item.to_string()];
    match item {
        BIOFUEL => names.push("Green Dye".to_string()),
        BOX_OF_SEEDS => {
            names.push("Seeds".to_string());
            names.push("Seed".to_string());
        }
        _ => {}
    }
    names
}

impl PurchaseFlow for ShoppingBuyer {
    fn start_session(&mut self, requests: &[PurchaseRequest], _world: &dyn World) -> bool {
        if self.core.is_running() {
            debug!("[{}] Already running, ignoring start", self.core.label());
            return false;
        }
        if !self.enabled {
            debug!("[{}] Disabled, ignoring start", self.core.label());
            return false;
        }

        // Keys are unique: a later line for the same item replaces the earlier one
        let mut list: Vec<PurchaseRequest> = Vec::new();
        for request in requests.iter().filter(|request| request.quantity > 0) {
            match list.iter_mut().find(|line| line.item == request.item) {
                Some(line) => line.quantity = request.quantity,
                None => list.push(request.clone()),
            }
        }
        if list.is_empty() {
            debug!("[{}] Nothing to buy", self.core.label());
            return false;
        }

        self.results = list
            .iter()
            .map(|request| ItemResult {
                item: request.item.clone(),
                requested: request.quantity,
                obtained: 0,
            })
            .collect();
        self.queue = list.into_iter().collect();
        self.retry_queue.clear();
        self.pending = None;
        self.passes.reset();
        self.core.begin();
        info!(
            "[{}] Shopping for {} item(s)",
            self.core.label(),
            self.results.len()
        );
        true
    }

    fn tick(&mut self, now: Instant, world: &mut dyn World) -> bool {
        if !self.core.is_running() || self.core.is_waiting(now) {
            return false;
        }
        self.core.trace_tick(world);

        let state = self.core.state();
        if state.is_navigation() {
            self.core.navigate(now, world);
        } else {
            match state {
                PurchaseState::SelectItem => self.select_item(now, world),
                PurchaseState::Verify => self.verify(now, world),
                _ => {}
            }
        }

        if self.core.state() == PurchaseState::Done {
            for result in &self.results {
                info!(
                    "[{}] {}: {}/{}",
                    self.core.label(),
                    result.item,
                    result.obtained,
                    result.requested
                );
            }
        }
        self.core.finish_if_terminal(world)
    }

    fn stop(&mut self) {
        self.queue.clear();
        self.retry_queue.clear();
        self.pending = None;
        self.core.halt();
    }

    fn is_running(&self) -> bool {
        self.core.is_running()
    }

    fn has_succeeded(&self) -> bool {
        self.core.ended_in(PurchaseState::Done)
            && self.results.iter().all(ItemResult::is_satisfied)
    }

    fn has_failed(&self) -> bool {
        self.core.has_failed()
    }

    fn state(&self) -> PurchaseState {
        self.core.state()
    }

    fn results(&self) -> Vec<ItemResult> {
        self.results.clone()
    }
}
