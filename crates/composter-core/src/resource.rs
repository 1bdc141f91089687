//! Resource label parsing
//!
//! The composter shows its two consumables as lore lines such as
//! `"12,345.6/64k"`. This module turns those lines into a [`ResourceLevel`]
//! and answers whether a level is below a configured threshold.

use regex::Regex;
use std::sync::LazyLock;

/// `<current>/<max>k`, where current may carry grouping and a fraction
static LABEL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,3}(?:,\d{3})*(?:\.\d+)?)/(\d{1,3})k$").expect("Invalid label pattern regex")
});

/// Formatting codes (`§` followed by one character)
static FORMAT_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"§.").expect("Invalid format code regex"));

/// A parsed current/max pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLevel {
    pub current: u64,
    pub max: u64,
}

impl ResourceLevel {
    /// Value reported for a level that could not be read
    pub const UNKNOWN_SENTINEL: i64 = -1;

    pub const fn new(current: u64, max: u64) -> Self {
        Self { current, max }
    }

    /// Fill target for a configured threshold: `min(max, max(0, threshold))`
    pub fn target(&self, threshold: i64) -> u64 {
        let threshold = u64::try_from(threshold.max(0)).unwrap_or(0);
        self.max.min(threshold)
    }

    /// True when the level sits below its fill target
    pub fn is_below(&self, threshold: i64) -> bool {
        self.current < self.target(threshold)
    }
}

/// Strip `§x` formatting codes and surrounding whitespace
pub fn strip_format_codes(text: &str) -> String {
    FORMAT_CODE_PATTERN.replace_all(text, "").trim().to_string()
}

/// Parse a single label line.
///
/// Returns `None` when the text does not match the label format.
///
/// ```
/// use composter_core::resource::{parse_label, ResourceLevel};
///
/// assert_eq!(parse_label("500/64k"), Some(ResourceLevel::new(500, 64_000)));
/// assert_eq!(parse_label("full"), None);
/// ```
pub fn parse_label(text: &str) -> Option<ResourceLevel> {
    let cleaned = strip_format_codes(text);
    let caps = LABEL_PATTERN.captures(&cleaned)?;

    let current_text = caps.get(1)?.as_str().replace(',', "");
    // Fractions are truncated, never rounded
    let current = match current_text.split_once('.') {
        Some((whole, _)) => whole.parse::<u64>().ok()?,
        None => current_text.parse::<u64>().ok()?,
    };
    let max = caps.get(2)?.as_str().parse::<u64>().ok()? * 1_000;

    Some(ResourceLevel { current, max })
}

/// Scan lore lines for a label; the last matching line wins
pub fn parse_lore<S: AsRef<str>>(lines: &[S]) -> Option<ResourceLevel> {
    lines
        .iter()
        .filter_map(|line| parse_label(line.as_ref()))
        .last()
}

/// Whether a possibly-unknown level needs replenishing.
///
/// An unknown level never needs anything: callers must not act on it.
pub fn needs(level: Option<ResourceLevel>, threshold: i64) -> bool {
    level.is_some_and(|level| level.is_below(threshold))
}

/// Render a level the way status lines show it (`-1/-1` when unknown)
pub fn describe(level: Option<ResourceLevel>) -> String {
    match level {
        Some(level) => format!("{}/{}", level.current, level.max),
        None => format!(
            "{}/{}",
            ResourceLevel::UNKNOWN_SENTINEL,
            ResourceLevel::UNKNOWN_SENTINEL
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_label() {
        assert_eq!(parse_label("500/64k"), Some(ResourceLevel::new(500, 64_000)));
    }

    #[test]
    fn test_parse_grouped_and_fractional() {
        assert_eq!(
            parse_label("12,345.9/40k"),
            Some(ResourceLevel::new(12_345, 40_000))
        );
        assert_eq!(
            parse_label("1,000,000/999k"),
            Some(ResourceLevel::new(1_000_000, 999_000))
        );
        assert_eq!(parse_label("0.5/1k"), Some(ResourceLevel::new(0, 1_000)));
    }

    #[test]
    fn test_parse_strips_format_codes_and_whitespace() {
        assert_eq!(
            parse_label("  §2§l20,000§7/§a64k  "),
            Some(ResourceLevel::new(20_000, 64_000))
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in [
            "",
            "500/64",
            "500/64K",
            "500 / 64k",
            "1234/64k",
            "12,34/64k",
            "500/1000k",
            "abc/64k",
            "500/64k extra",
            "Organic Matter: 500/64k",
        ] {
            assert_eq!(parse_label(text), None, "{text:?} should not parse");
        }
    }

    #[test]
    fn test_parse_lore_last_match_wins() {
        let lore = vec![
            "§7Organic Matter stored".to_string(),
            "100/20k".to_string(),
            "§eStored: ".to_string(),
            "2,500/40k".to_string(),
        ];
        assert_eq!(parse_lore(&lore), Some(ResourceLevel::new(2_500, 40_000)));
        assert_eq!(parse_lore::<&str>(&[]), None);
    }

    #[test]
    fn test_needs_threshold() {
        let low = Some(ResourceLevel::new(200, 64_000));
        let high = Some(ResourceLevel::new(500, 64_000));
        assert!(needs(low, 300));
        assert!(!needs(high, 300));
    }

    #[test]
    fn test_needs_caps_threshold_at_max() {
        // Threshold above capacity: target becomes max, full tank is fine
        let full = Some(ResourceLevel::new(1_000, 1_000));
        assert!(!needs(full, 5_000));
        let nearly = Some(ResourceLevel::new(999, 1_000));
        assert!(needs(nearly, 5_000));
    }

    #[test]
    fn test_needs_negative_threshold_is_zero() {
        let empty = Some(ResourceLevel::new(0, 64_000));
        assert!(!needs(empty, -50));
    }

    #[test]
    fn test_unknown_level_never_needs() {
        assert!(!needs(None, i64::MAX));
        assert!(!needs(parse_label("garbage"), 1_000));
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(Some(ResourceLevel::new(5, 1_000))), "5/1000");
        assert_eq!(describe(None), "-1/-1");
    }
}
