//! Alert severity and threshold comparison mode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Alert severity tier.
///
/// Only two tiers exist: one breaching exchange is a warning, two or more
/// is an emergency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Warn,
    Emergency,
}

impl AlertLevel {
    /// Classify by number of breaching exchanges. Magnitude is irrelevant.
    pub fn from_breach_count(count: usize) -> Option<Self> {
        match count {
            0 => None,
            1 => Some(AlertLevel::Warn),
            _ => Some(AlertLevel::Emergency),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Warn => "WARN",
            AlertLevel::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How divergence is compared against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMode {
    /// `abs(diff / spot * 100)` against a percentage threshold
    #[default]
    Percentage,
    /// `abs(futures - spot)` against an absolute price threshold
    Absolute,
}

impl ThresholdMode {
    pub fn from_use_percentage(use_percentage: bool) -> Self {
        if use_percentage {
            ThresholdMode::Percentage
        } else {
            ThresholdMode::Absolute
        }
    }

    /// Unit suffix for thresholds in logs and messages.
    pub fn unit(self) -> &'static str {
        match self {
            ThresholdMode::Percentage => "%",
            ThresholdMode::Absolute => "",
        }
    }
}
