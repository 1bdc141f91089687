//! Single-item purchase flows (Biofuel and Box of Seeds)

use std::time::Instant;

use composter_core::prelude::*;
use composter_core::{ClickType, RetryCounter, Slot};

use super::engine::{DebugLevel, FlowCore, FlowTiming};
use super::{ItemResult, PurchaseFlow, PurchaseRequest, PurchaseState, BIOFUEL, BOX_OF_SEEDS};
use crate::config::Settings;
use crate::pacing::Pacing;
use crate::world::{find_any, World};

/// Delay between the purchase click and the inventory check
const VERIFY_DELAY_MS: u64 = 1_000;

const CONFIRM_LABELS: [&str; 3] = ["Confirm", "Purchase", "Buy"];

/// How the item is acquired once the category view is open
#[derive(Debug, Clone)]
pub enum Acquisition {
    /// Right-click opens a submenu; pick a batch, then maybe confirm
    Batch {
        batch_label_override: String,
        confirm_label_override: String,
        menu_name_override: String,
    },
    /// Shift-click once per unit
    QuickBuy,
}

/// Buys one item and verifies the inventory delta
#[derive(Debug)]
pub struct ItemBuyer {
    core: FlowCore,
    enabled: bool,
    /// Primary name first, then alternates
    names: Vec<String>,
    acquisition: Acquisition,
    requested: u32,
    pre_count: u32,
    obtained: u32,
    retries: RetryCounter,
}

impl ItemBuyer {
    pub fn new(
        core: FlowCore,
        enabled: bool,
        names: Vec<String>,
        acquisition: Acquisition,
        max_retries: u32,
    ) -> Self {
        Self {
            core,
            enabled,
            names,
            acquisition,
            requested: 0,
            pre_count: 0,
            obtained: 0,
            retries: RetryCounter::new(max_retries),
        }
    }

    /// Biofuel through the batch submenu
    pub fn biofuel(settings: &Settings, pacing: Pacing) -> Self {
        let flow = &settings.purchase.biofuel;
        let core = FlowCore::new(
            "BiofuelBuyer",
            settings.purchase.menu.clone(),
            settings.composter.view_matching,
            FlowTiming {
                timeout_ms: flow.timeout_ms,
                extra_delay_ms: flow.gui_delay_ms,
            },
            DebugLevel::new(flow.debug_level),
            pacing,
        );
        Self::new(
            core,
            flow.enabled,
            vec![BIOFUEL.to_string(), "Green Dye".to_string()],
            Acquisition::Batch {
                batch_label_override: flow.batch_label_override.trim().to_string(),
                confirm_label_override: flow.confirm_label_override.trim().to_string(),
                menu_name_override: flow.menu_name_override.trim().to_string(),
            },
            flow.max_retries,
        )
    }

    /// Box of Seeds through quick-buy clicks
    pub fn box_of_seeds(settings: &Settings, pacing: Pacing) -> Self {
        let flow = &settings.purchase.box_of_seeds;
        let core = FlowCore::new(
            "BoxOfSeedsBuyer",
            settings.purchase.menu.clone(),
            settings.composter.view_matching,
            FlowTiming {
                timeout_ms: flow.timeout_ms,
                extra_delay_ms: flow.gui_delay_ms,
            },
            DebugLevel::new(flow.debug_level),
            pacing,
        );
        Self::new(
            core,
            flow.enabled,
            vec![BOX_OF_SEEDS.to_string(), "Seeds".to_string()],
            Acquisition::QuickBuy,
            flow.max_retries,
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn item(&self) -> &str {
        &self.names[0]
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.core.fault()
    }

    pub fn retries_used(&self) -> u32 {
        self.retries.attempts()
    }

    // ─────────────────────────────────────────────────────────────
    // Steps
    // ─────────────────────────────────────────────────────────────

    fn select_item(&mut self, now: Instant, world: &mut dyn World) {
        let Some(slot) = find_any(world, &self.names) else {
            let view = world.open_view().unwrap_or_default();
            self.core.fail(Fault::not_found(self.names.join("/"), view));
            return;
        };

        match self.acquisition {
            Acquisition::Batch { .. } => {
                self.core.click(world, &slot, ClickType::Right);
                self.core.transition(PurchaseState::AwaitSubmenu);
                self.core.arm_timeout(now);
                self.core.gui_delay(now);
            }
            Acquisition::QuickBuy => {
                for _ in 0..self.requested {
                    self.core.click(world, &slot, ClickType::QuickMove);
                }
                self.core.transition(PurchaseState::Verify);
                self.core.delay_ms(now, VERIFY_DELAY_MS);
            }
        }
    }

    fn await_submenu(&mut self, now: Instant, world: &mut dyn World) {
        let Acquisition::Batch {
            menu_name_override, ..
        } = &self.acquisition
        else {
            return;
        };

        let by_name = !menu_name_override.is_empty()
            && self
                .core
                .view_matches(world, std::slice::from_ref(menu_name_override));
        let by_content = world
            .view_slots()
            .iter()
            .any(|slot| slot.name_contains_any(&self.names));
        let any_view = world.open_view().is_some();

        if by_name || by_content || any_view {
            self.core.transition(PurchaseState::SelectBatch);
            self.core.gui_delay(now);
        } else if self.core.timed_out(now) {
            self.core.fail(Fault::timeout("purchase submenu"));
        }
    }

    fn select_batch(&mut self, now: Instant, world: &mut dyn World) {
        let Some(slot) = self.find_batch(world) else {
            let view = world.open_view().unwrap_or_default();
            self.core
                .fail(Fault::not_found(format!("batch of {}", self.requested), view));
            return;
        };

        self.core.click(world, &slot, ClickType::Left);

        if self.find_confirm(world).is_some() {
            self.core.transition(PurchaseState::Confirm);
            self.core.gui_delay(now);
        } else {
            self.core.transition(PurchaseState::Verify);
            self.core.delay_ms(now, VERIFY_DELAY_MS);
        }
    }

    /// Stack size first, then the label override, then label templates
    fn find_batch(&self, world: &dyn World) -> Option<Slot> {
        let by_stack = world
            .view_slots()
            .into_iter()
            .find(|slot| slot.name_contains_any(&self.names) && slot.stack_size == self.requested);
        if by_stack.is_some() {
            return by_stack;
        }

        if let Acquisition::Batch {
            batch_label_override,
            ..
        } = &self.acquisition
        {
            if let Some(slot) = find_any(world, std::slice::from_ref(batch_label_override)) {
                return Some(slot);
            }
        }

        let n = self.requested;
        let templates = [
            format!("x{n}"),
            format!("{n}x"),
            format!("Buy {n}"),
            n.to_string(),
        ];
        find_any(world, &templates)
    }

    fn find_confirm(&self, world: &dyn World) -> Option<Slot> {
        if let Acquisition::Batch {
            confirm_label_override,
            ..
        } = &self.acquisition
        {
            if let Some(slot) = find_any(world, std::slice::from_ref(confirm_label_override)) {
                return Some(slot);
            }
        }
        find_any(world, &CONFIRM_LABELS)
    }

    fn confirm(&mut self, now: Instant, world: &mut dyn World) {
        let Some(slot) = self.find_confirm(world) else {
            let view = world.open_view().unwrap_or_default();
            self.core.fail(Fault::not_found("confirm button", view));
            return;
        };
        self.core.click(world, &slot, ClickType::Left);
        self.core.transition(PurchaseState::Verify);
        self.core.delay_ms(now, VERIFY_DELAY_MS);
    }

    fn verify(&mut self, now: Instant, world: &mut dyn World) {
        let count = world.item_count(self.item());
        let gained = count.saturating_sub(self.pre_count);
        self.obtained = gained;

        if gained >= self.requested {
            info!(
                "[{}] Bought {} {} (gained {})",
                self.core.label(),
                self.requested,
                self.item(),
                gained
            );
            self.core.transition(PurchaseState::Done);
        } else if self.retries.try_consume() {
            warn!(
                "[{}] Only {}/{} {} arrived, retrying ({}/{})",
                self.core.label(),
                gained,
                self.requested,
                self.item(),
                self.retries.attempts(),
                self.retries.ceiling()
            );
            self.core.transition(PurchaseState::SelectItem);
            self.core.gui_delay(now);
        } else {
            let fault = Fault::VerificationShortfall {
                item: self.item().to_string(),
                requested: self.requested,
                gained,
            };
            self.core.fail(fault);
        }
    }
}

impl PurchaseFlow for ItemBuyer {
    fn start_session(&mut self, requests: &[PurchaseRequest], world: &dyn World) -> bool {
        if self.core.is_running() {
            debug!("[{}] Already running, ignoring start", self.core.label());
            return false;
        }
        if !self.enabled {
            debug!("[{}] Disabled, ignoring start", self.core.label());
            return false;
        }

        let quantity = requests
            .iter()
            .find(|request| request.item == self.item())
            .map(|request| request.quantity)
            .unwrap_or(0);
        if quantity == 0 {
            debug!("[{}] Nothing to buy", self.core.label());
            return false;
        }

        self.requested = quantity;
        self.pre_count = world.item_count(self.item());
        self.obtained = 0;
        self.retries.reset();
        self.core.begin();
        info!(
            "[{}] Buying {} {} (have {})",
            self.core.label(),
            quantity,
            self.item(),
            self.pre_count
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
                PurchaseState::AwaitSubmenu => self.await_submenu(now, world),
                PurchaseState::SelectBatch => self.select_batch(now, world),
                PurchaseState::Confirm => self.confirm(now, world),
                PurchaseState::Verify => self.verify(now, world),
                _ => {}
            }
        }

        self.core.finish_if_terminal(world)
    }

    fn stop(&mut self) {
        self.core.halt();
    }

    fn is_running(&self) -> bool {
        self.core.is_running()
    }

    fn has_succeeded(&self) -> bool {
        self.core.ended_in(PurchaseState::Done) && self.obtained >= self.requested
    }

    fn has_failed(&self) -> bool {
        self.core.has_failed()
    }

    fn state(&self) -> PurchaseState {
        self.core.state()
    }

    fn results(&self) -> Vec<ItemResult> {
        if self.requested == 0 {
            return Vec::new();
        }
        vec![ItemResult {
            item: self.item().to_string(),
            requested: self.requested,
            obtained: self.obtained,
        }]
    }
}
