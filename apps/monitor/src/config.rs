//! Monitor configuration, resolved once at startup from the environment.

use rust_decimal::Decimal;
use spread_alerts::TelegramConfig;
use spread_core::{CoreError, Exchange, MarketType, ThresholdMode};
use spread_engine::{CooldownPolicy, MonitorSettings, Thresholds};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key}: {source}")]
    Exchange { key: &'static str, source: CoreError },

    #[error("{key}: '{value}' is not a valid number")]
    Number { key: &'static str, value: String },

    #[error("{key}: '{value}' is not a valid boolean")]
    Bool { key: &'static str, value: String },

    #[error("SYMBOL_THRESHOLDS: invalid entry '{0}', expected SYMBOL=value")]
    Override(String),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("CHECK_INTERVAL must be at least 1 second")]
    ZeroInterval,

    #[error("REFERENCE_EXCHANGE: {0} has no futures feed")]
    NoFutures(Exchange),
}

/// Typed monitor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub exchanges: Vec<Exchange>,
    pub symbols: Vec<String>,
    pub threshold: Decimal,
    pub symbol_thresholds: BTreeMap<String, Decimal>,
    pub use_percentage: bool,
    pub check_interval_secs: u64,
    pub warn_cooldown: chrono::Duration,
    pub emergency_cooldown: chrono::Duration,
    pub reference_exchange: Exchange,
    /// `None` when BOT_TOKEN or ADMIN_CHAT_ID is missing
    pub telegram: Option<TelegramConfig>,
}

fn list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Bool {
            key,
            value: raw.to_string(),
        }),
    }
}

fn parse_num<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Number {
        key,
        value: raw.to_string(),
    })
}

/// Whole seconds that fit a `chrono::Duration`.
fn parse_cooldown(key: &'static str, raw: &str) -> Result<chrono::Duration, ConfigError> {
    let invalid = || ConfigError::Number {
        key,
        value: raw.to_string(),
    };
    let secs: u64 = parse_num(key, raw)?;
    let secs = i64::try_from(secs).map_err(|_| invalid())?;
    chrono::Duration::try_seconds(secs).ok_or_else(invalid)
}

fn parse_overrides(raw: &str) -> Result<BTreeMap<String, Decimal>, ConfigError> {
    let mut map = BTreeMap::new();
    for entry in list(raw) {
        let (symbol, value) = entry
            .split_once('=')
            .ok_or_else(|| ConfigError::Override(entry.to_string()))?;
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ConfigError::Override(entry.to_string()));
        }
        let value = Decimal::from_str(value.trim()).map_err(|_| ConfigError::Override(entry.to_string()))?;
        map.insert(symbol, value);
    }
    Ok(map)
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let mut exchanges = Vec::new();
        for name in list(&get("EXCHANGES", "gateio")) {
            let exchange = Exchange::from_str(name).map_err(|source| ConfigError::Exchange {
                key: "EXCHANGES",
                source,
            })?;
            if !exchanges.contains(&exchange) {
                exchanges.push(exchange);
            }
        }
        if exchanges.is_empty() {
            return Err(ConfigError::Empty("EXCHANGES"));
        }

        let mut symbols: Vec<String> = Vec::new();
        for symbol in list(&get("MONITOR_SYMBOLS", "TSLAX_USDT")) {
            let symbol = symbol.to_uppercase();
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        if symbols.is_empty() {
            return Err(ConfigError::Empty("MONITOR_SYMBOLS"));
        }

        let reference_exchange =
            Exchange::from_str(&get("REFERENCE_EXCHANGE", "gateio")).map_err(|source| {
                ConfigError::Exchange {
                    key: "REFERENCE_EXCHANGE",
                    source,
                }
            })?;
        if !reference_exchange.has_futures() {
            return Err(ConfigError::NoFutures(reference_exchange));
        }

        let check_interval_secs = parse_num("CHECK_INTERVAL", &get("CHECK_INTERVAL", "1"))?;
        if check_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        Ok(Self {
            exchanges,
            symbols,
            threshold: parse_num("PRICE_DIFF_THRESHOLD", &get("PRICE_DIFF_THRESHOLD", "0.5"))?,
            symbol_thresholds: parse_overrides(&get("SYMBOL_THRESHOLDS", ""))?,
            use_percentage: parse_bool("USE_PERCENTAGE", &get("USE_PERCENTAGE", "true"))?,
            check_interval_secs,
            warn_cooldown: parse_cooldown("WARN_COOLDOWN", &get("WARN_COOLDOWN", "300"))?,
            emergency_cooldown: parse_cooldown("EMERGENCY_COOLDOWN", &get("EMERGENCY_COOLDOWN", "180"))?,
            reference_exchange,
            telegram: TelegramConfig::from_lookup(&lookup),
        })
    }

    pub fn mode(&self) -> ThresholdMode {
        ThresholdMode::from_use_percentage(self.use_percentage)
    }

    /// Feeds to start: every enabled exchange's spot market plus the
    /// reference exchange's futures market.
    pub fn feed_plan(&self) -> Vec<(Exchange, MarketType)> {
        let mut plan: Vec<(Exchange, MarketType)> =
            self.exchanges.iter().map(|&e| (e, MarketType::Spot)).collect();
        plan.push((self.reference_exchange, MarketType::Futures));
        plan
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        let mut thresholds = Thresholds::new(self.threshold, self.mode());
        thresholds.overrides = self
            .symbol_thresholds
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect::<HashMap<_, _>>();

        MonitorSettings {
            symbols: self.symbols.clone(),
            exchanges: self.exchanges.clone(),
            reference_exchange: self.reference_exchange,
            thresholds,
            interval: Duration::from_secs(self.check_interval_secs),
            cooldowns: CooldownPolicy::new(self.warn_cooldown, self.emergency_cooldown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.exchanges, vec![Exchange::GateIO]);
        assert_eq!(config.symbols, vec!["TSLAX_USDT".to_string()]);
        assert_eq!(config.threshold, Decimal::new(5, 1));
        assert!(config.symbol_thresholds.is_empty());
        assert!(config.use_percentage);
        assert_eq!(config.check_interval_secs, 1);
        assert_eq!(config.warn_cooldown, chrono::Duration::seconds(300));
        assert_eq!(config.emergency_cooldown, chrono::Duration::seconds(180));
        assert_eq!(config.reference_exchange, Exchange::GateIO);
        assert_eq!(config.telegram, None);
    }

    #[test]
    fn test_full_config() {
        let config = MonitorConfig::from_lookup(lookup(&[
            ("EXCHANGES", "gateio, Bybit, gate.io"),
            ("MONITOR_SYMBOLS", "tslax_usdt,AAPLX_USDT"),
            ("PRICE_DIFF_THRESHOLD", "1.5"),
            ("SYMBOL_THRESHOLDS", "AAPLX_USDT=0.8, tslax_usdt = 2"),
            ("USE_PERCENTAGE", "False"),
            ("CHECK_INTERVAL", "3"),
            ("WARN_COOLDOWN", "600"),
            ("EMERGENCY_COOLDOWN", "60"),
            ("BOT_TOKEN", "123:abc"),
            ("ADMIN_CHAT_ID", "42"),
            ("HTTP_PROXY", "http://proxy:8080"),
        ]))
        .unwrap();

        assert_eq!(config.exchanges, vec![Exchange::GateIO, Exchange::Bybit]);
        assert_eq!(config.symbols, vec!["TSLAX_USDT".to_string(), "AAPLX_USDT".to_string()]);
        assert_eq!(config.symbol_thresholds.get("TSLAX_USDT"), Some(&Decimal::TWO));
        assert_eq!(config.mode(), ThresholdMode::Absolute);

        let telegram = config.telegram.clone().unwrap();
        assert_eq!(telegram.chat_id, "42");
        assert_eq!(telegram.proxy.as_deref(), Some("http://proxy:8080"));

        let settings = config.monitor_settings();
        assert_eq!(settings.thresholds.for_symbol("AAPLX_USDT"), Decimal::new(8, 1));
        assert_eq!(settings.thresholds.for_symbol("OTHER"), Decimal::new(15, 1));
        assert_eq!(settings.interval, Duration::from_secs(3));
        assert_eq!(settings.cooldowns.warn, chrono::Duration::seconds(600));
    }

    #[test]
    fn test_feed_plan() {
        let config =
            MonitorConfig::from_lookup(lookup(&[("EXCHANGES", "bybit,gateio")])).unwrap();
        assert_eq!(
            config.feed_plan(),
            vec![
                (Exchange::Bybit, MarketType::Spot),
                (Exchange::GateIO, MarketType::Spot),
                (Exchange::GateIO, MarketType::Futures),
            ]
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            MonitorConfig::from_lookup(lookup(&[("EXCHANGES", "gateio,kraken")])),
            Err(ConfigError::Exchange { key: "EXCHANGES", .. })
        ));
        assert!(matches!(
            MonitorConfig::from_lookup(lookup(&[("PRICE_DIFF_THRESHOLD", "half")])),
            Err(ConfigError::Number { key: "PRICE_DIFF_THRESHOLD", .. })
        ));
        assert!(matches!(
            MonitorConfig::from_lookup(lookup(&[("USE_PERCENTAGE", "maybe")])),
            Err(ConfigError::Bool { .. })
        ));
        assert!(matches!(
            MonitorConfig::from_lookup(lookup(&[("SYMBOL_THRESHOLDS", "TSLAX_USDT")])),
            Err(ConfigError::Override(_))
        ));
        assert_eq!(
            MonitorConfig::from_lookup(lookup(&[("CHECK_INTERVAL", "0")])),
            Err(ConfigError::ZeroInterval)
        );
        assert_eq!(
            MonitorConfig::from_lookup(lookup(&[("REFERENCE_EXCHANGE", "bybit")])),
            Err(ConfigError::NoFutures(Exchange::Bybit))
        );
        assert_eq!(
            MonitorConfig::from_lookup(lookup(&[("MONITOR_SYMBOLS", " , ")])),
            Err(ConfigError::Empty("MONITOR_SYMBOLS"))
        );
    }

    #[test]
    fn test_cooldown_out_of_range() {
        // Larger than chrono's maximum duration
        assert!(matches!(
            MonitorConfig::from_lookup(lookup(&[("WARN_COOLDOWN", "10000000000000000")])),
            Err(ConfigError::Number { key: "WARN_COOLDOWN", .. })
        ));
        // Larger than i64::MAX
        assert!(matches!(
            MonitorConfig::from_lookup(lookup(&[("EMERGENCY_COOLDOWN", "18446744073709551615")])),
            Err(ConfigError::Number { key: "EMERGENCY_COOLDOWN", .. })
        ));
        assert!(matches!(
            MonitorConfig::from_lookup(lookup(&[("WARN_COOLDOWN", "-5")])),
            Err(ConfigError::Number { key: "WARN_COOLDOWN", .. })
        ));

        let config = MonitorConfig::from_lookup(lookup(&[("WARN_COOLDOWN", "86400")])).unwrap();
        assert_eq!(config.monitor_settings().cooldowns.warn, chrono::Duration::days(1));
    }
}
