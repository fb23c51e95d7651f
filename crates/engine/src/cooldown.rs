//! Alert cooldown book and the WARN → EMERGENCY escalation rule.
//!
//! Per symbol, one "last dispatched" timestamp per level. Both start at the
//! Unix epoch when the symbol is registered and only move forward, and only
//! after the notifier confirmed delivery.

use chrono::{DateTime, Duration, Utc};
use spread_core::AlertLevel;
use std::collections::HashMap;

/// Minimum time between two dispatched alerts of the same level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownPolicy {
    pub warn: Duration,
    pub emergency: Duration,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            warn: Duration::seconds(300),
            emergency: Duration::seconds(180),
        }
    }
}

impl CooldownPolicy {
    pub fn new(warn: Duration, emergency: Duration) -> Self {
        Self { warn, emergency }
    }

    pub fn for_level(&self, level: AlertLevel) -> Duration {
        match level {
            AlertLevel::Warn => self.warn,
            AlertLevel::Emergency => self.emergency,
        }
    }
}

/// What to do with a classified breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Cooldown for the level has elapsed
    Dispatch,
    /// EMERGENCY right after a recent WARN; bypasses the EMERGENCY cooldown
    Escalate,
    /// Still inside the cooldown window
    Cooling { remaining: Duration },
}

impl Decision {
    pub fn should_dispatch(&self) -> bool {
        matches!(self, Decision::Dispatch | Decision::Escalate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LevelTimes {
    warn: DateTime<Utc>,
    emergency: DateTime<Utc>,
}

impl Default for LevelTimes {
    fn default() -> Self {
        Self {
            warn: DateTime::<Utc>::UNIX_EPOCH,
            emergency: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl LevelTimes {
    fn get(&self, level: AlertLevel) -> DateTime<Utc> {
        match level {
            AlertLevel::Warn => self.warn,
            AlertLevel::Emergency => self.emergency,
        }
    }

    fn slot(&mut self, level: AlertLevel) -> &mut DateTime<Utc> {
        match level {
            AlertLevel::Warn => &mut self.warn,
            AlertLevel::Emergency => &mut self.emergency,
        }
    }
}

/// Last successful dispatch per (symbol, level).
#[derive(Debug, Clone, Default)]
pub struct CooldownBook {
    policy: CooldownPolicy,
    entries: HashMap<String, LevelTimes>,
}

impl CooldownBook {
    pub fn new(policy: CooldownPolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &CooldownPolicy {
        &self.policy
    }

    /// Register a symbol with both levels at "never". Idempotent.
    pub fn register(&mut self, symbol: &str) {
        self.entries.entry(symbol.to_string()).or_default();
    }

    pub fn is_registered(&self, symbol: &str) -> bool {
        self.entries.contains_key(symbol)
    }

    /// Last dispatch time; the epoch for symbols never registered.
    pub fn last(&self, symbol: &str, level: AlertLevel) -> DateTime<Utc> {
        self.entries
            .get(symbol)
            .map(|t| t.get(level))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Decide whether a breach of `level` at `now` may be dispatched.
    pub fn decide(&self, symbol: &str, level: AlertLevel, now: DateTime<Utc>) -> Decision {
        let last_warn = self.last(symbol, AlertLevel::Warn);
        let last_emergency = self.last(symbol, AlertLevel::Emergency);

        if level == AlertLevel::Emergency
            && last_warn > last_emergency
            && now - last_warn < self.policy.warn
        {
            return Decision::Escalate;
        }

        let cooldown = self.policy.for_level(level);
        let elapsed = now - self.last(symbol, level);
        if elapsed >= cooldown {
            Decision::Dispatch
        } else {
            Decision::Cooling {
                remaining: cooldown - elapsed,
            }
        }
    }

    /// Record a confirmed dispatch. Timestamps never move backwards.
    pub fn record(&mut self, symbol: &str, level: AlertLevel, now: DateTime<Utc>) {
        let slot = self.entries.entry(symbol.to_string()).or_default().slot(level);
        if now > *slot {
            *slot = now;
        }
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
