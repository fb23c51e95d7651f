//! Per-symbol divergence thresholds.

use rust_decimal::Decimal;
use spread_core::ThresholdMode;
use std::collections::HashMap;

/// Global default plus explicit per-symbol overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub default: Decimal,
    pub overrides: HashMap<String, Decimal>,
    pub mode: ThresholdMode,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            // 0.5%
            default: Decimal::new(5, 1),
            overrides: HashMap::new(),
            mode: ThresholdMode::Percentage,
        }
    }
}

impl Thresholds {
    pub fn new(default: Decimal, mode: ThresholdMode) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
            mode,
        }
    }

    /// Builder-style override for one symbol.
    pub fn with_override(mut self, symbol: &str, threshold: Decimal) -> Self {
        self.overrides.insert(symbol.to_uppercase(), threshold);
        self
    }

    pub fn for_symbol(&self, symbol: &str) -> Decimal {
        self.overrides.get(symbol).copied().unwrap_or(self.default)
    }
}
