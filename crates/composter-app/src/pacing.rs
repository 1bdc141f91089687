//! Humanlike delay generation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::GuiSettings;

/// Source of randomized delays, in milliseconds.
///
/// Seedable so tests and simulations replay the same timings.
#[derive(Debug, Clone)]
pub struct Pacing {
    gui: GuiSettings,
    rng: StdRng,
}

impl Pacing {
    pub fn new(gui: GuiSettings) -> Self {
        Self {
            gui,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(gui: GuiSettings, seed: u64) -> Self {
        Self {
            gui,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Independent stream for a nested component
    pub fn fork(&mut self) -> Self {
        Self {
            gui: self.gui.clone(),
            rng: StdRng::seed_from_u64(self.rng.gen()),
        }
    }

    /// Uniform in `[low, high]`
    pub fn between(&mut self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }

    /// Configured GUI delay plus its random extra
    pub fn gui_delay(&mut self) -> u64 {
        let extra = self.gui.delay_randomness_ms;
        self.gui.delay_ms.saturating_add(self.between(0, extra))
    }

    /// Pause between commands (1.1 to 1.4 s)
    pub fn command_gap(&mut self) -> u64 {
        self.between(1_100, 1_400)
    }

    /// Short pause after closing a view (0.5 to 1 s)
    pub fn short(&mut self) -> u64 {
        self.between(500, 1_000)
    }

    pub fn stuck_window_ms(&self) -> u64 {
        self.gui.stuck_window_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gui() -> GuiSettings {
        GuiSettings {
            delay_ms: 200,
            delay_randomness_ms: 50,
        }
    }

    #[test]
    fn test_ranges() {
        let mut pacing = Pacing::seeded(gui(), 7);
        for _ in 0..200 {
            let gap = pacing.command_gap();
            assert!((1_100..=1_400).contains(&gap));
            let short = pacing.short();
            assert!((500..=1_000).contains(&short));
            let gui = pacing.gui_delay();
            assert!((200..=250).contains(&gui));
        }
    }

    #[test]
    fn test_gui_delay_saturates() {
        let mut pacing = Pacing::seeded(
            GuiSettings {
                delay_ms: u64::MAX - 5,
                delay_randomness_ms: 100,
            },
            3,
        );
        let delay = pacing.gui_delay();
        assert!(delay >= u64::MAX - 5);
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let mut a = Pacing::seeded(gui(), 42);
        let mut b = Pacing::seeded(gui(), 42);
        let left: Vec<u64> = (0..10).map(|_| a.command_gap()).collect();
        let right: Vec<u64> = (0..10).map(|_| b.command_gap()).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_degenerate_range() {
        let mut pacing = Pacing::seeded(gui(), 1);
        assert_eq!(pacing.between(300, 300), 300);
        assert_eq!(pacing.between(300, 100), 300);
    }

    #[test]
    fn test_stuck_window() {
        assert_eq!(Pacing::seeded(gui(), 0).stuck_window_ms(), 7_750);
    }
}
