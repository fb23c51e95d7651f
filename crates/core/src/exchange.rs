//! Exchange identifiers and market types.

use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Market type of a ticker stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Spot,
    Futures,
}

impl MarketType {
    pub fn as_str(self) -> &'static str {
        match self {
            MarketType::Spot => "spot",
            MarketType::Futures => "futures",
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exchange identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Exchange {
    Bybit,
    GateIO,
}

impl Exchange {
    /// Display name used in alert text.
    pub fn as_str(self) -> &'static str {
        match self {
            Exchange::Bybit => "Bybit",
            Exchange::GateIO => "Gate.io",
        }
    }

    /// Lowercase key used in configuration and logs.
    pub fn key(self) -> &'static str {
        match self {
            Exchange::Bybit => "bybit",
            Exchange::GateIO => "gateio",
        }
    }

    /// Whether this exchange publishes a futures ticker stream we can consume.
    pub fn has_futures(self) -> bool {
        match self {
            Exchange::GateIO => true,
            Exchange::Bybit => false,
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gateio" | "gate.io" | "gate" => Ok(Exchange::GateIO),
            "bybit" => Ok(Exchange::Bybit),
            other => Err(CoreError::UnknownExchange(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Exchange tests ===

    #[test]
    fn test_exchange_parse_aliases() {
        assert_eq!("gateio".parse::<Exchange>(), Ok(Exchange::GateIO));
        assert_eq!("Gate.io".parse::<Exchange>(), Ok(Exchange::GateIO));
        assert_eq!(" BYBIT ".parse::<Exchange>(), Ok(Exchange::Bybit));
        assert_eq!(
            "bitget".parse::<Exchange>(),
            Err(CoreError::UnknownExchange("bitget".to_string()))
        );
    }

    #[test]
    fn test_exchange_futures_support() {
        assert!(Exchange::GateIO.has_futures());
        assert!(!Exchange::Bybit.has_futures());
    }

    #[test]
    fn test_exchange_names() {
        assert_eq!(Exchange::GateIO.as_str(), "Gate.io");
        assert_eq!(Exchange::GateIO.key(), "gateio");
        assert_eq!(Exchange::Bybit.to_string(), "Bybit");
    }

    // === MarketType tests ===

    #[test]
    fn test_market_type_display() {
        assert_eq!(MarketType::Spot.to_string(), "spot");
        assert_eq!(MarketType::Futures.as_str(), "futures");
    }

    #[test]
    fn test_market_type_serde() {
        let json = serde_json::to_string(&MarketType::Futures).unwrap();
        assert_eq!(json, "\"futures\"");
    }
}
