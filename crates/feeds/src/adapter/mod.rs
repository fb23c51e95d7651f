//! Exchange adapter trait and implementations.
//!
//! Each exchange has its own WebSocket message format.
//! Adapters normalize ticker frames into [`WireTicker`]s and produce the
//! subscribe and keep-alive frames the exchange expects.

mod bybit;
mod gateio;

pub use bybit::BybitAdapter;
pub use gateio::GateIOAdapter;

use crate::FeedError;
use rust_decimal::Decimal;
use serde_json::Value;
use spread_core::{AuxFields, Exchange, MarketType};
use std::str::FromStr;
use std::sync::Arc;

/// One parsed ticker, still keyed by the exchange's wire symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct WireTicker {
    pub symbol: String,
    pub price: Decimal,
    pub extra: AuxFields,
}

/// Trait for exchange-specific WebSocket adapters.
///
/// Adapters are stateless; the same instance serves every market the
/// exchange supports.
pub trait ExchangeAdapter: Send + Sync {
    fn exchange(&self) -> Exchange;

    /// Whether this exchange has a ticker stream for `market`.
    fn supports(&self, market: MarketType) -> bool;

    /// WebSocket endpoint for `market`.
    fn ws_url(&self, market: MarketType) -> Result<&'static str, FeedError>;

    /// Translate a canonical `BASE_QUOTE` symbol to the exchange's form.
    fn wire_symbol(&self, canonical: &str) -> String;

    /// Subscribe frames for the given wire symbols.
    fn subscribe_messages(&self, market: MarketType, symbols: &[String]) -> Vec<String>;

    /// Application-level ping frame, if the exchange wants one.
    fn ping_message(&self, market: MarketType) -> Option<String>;

    /// Whether a text frame is the response to our application ping.
    fn is_pong(&self, text: &str) -> bool;

    /// Parse a text frame into tickers.
    ///
    /// Frames that are not ticker updates (acks, pongs, other channels)
    /// yield an empty list. A ticker frame whose price cannot be read is an
    /// error and must not touch the board.
    fn parse_tickers(&self, market: MarketType, text: &str) -> Result<Vec<WireTicker>, FeedError>;
}

/// Get the adapter for an exchange.
pub fn adapter_for(exchange: Exchange) -> Arc<dyn ExchangeAdapter> {
    match exchange {
        Exchange::GateIO => Arc::new(GateIOAdapter),
        Exchange::Bybit => Arc::new(BybitAdapter),
    }
}

/// Read a JSON field that exchanges send either as a string or a number.
pub(crate) fn field_str(obj: &Value, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a price field into a strictly positive decimal.
pub(crate) fn parse_price(obj: &Value, key: &str) -> Result<Decimal, FeedError> {
    let raw = field_str(obj, key)
        .ok_or_else(|| FeedError::ParseError(format!("missing price field '{}'", key)))?;
    let raw = raw.trim();
    let price = Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw))?;
    if price <= Decimal::ZERO {
        return Err(FeedError::ParseError(format!(
            "non-positive price '{}' in field '{}'",
            raw, key
        )));
    }
    Ok(price)
}

/// Copy `(wire key, aux key)` pairs from a JSON object into [`AuxFields`].
pub(crate) fn collect_extra(obj: &Value, fields: &[(&str, &str)]) -> AuxFields {
    let mut extra = AuxFields::new();
    for (wire_key, aux_key) in fields {
        let value = field_str(obj, wire_key);
        extra.set(aux_key, value.as_deref());
    }
    extra
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_adapter_for() {
        assert_eq!(adapter_for(Exchange::GateIO).exchange(), Exchange::GateIO);
        assert_eq!(adapter_for(Exchange::Bybit).exchange(), Exchange::Bybit);
    }

    #[test]
    fn test_parse_price_string_and_number() {
        let obj = json!({"a": "440.42", "b": 437, "c": "1.5e2"});
        assert_eq!(parse_price(&obj, "a").unwrap(), Decimal::from_str("440.42").unwrap());
        assert_eq!(parse_price(&obj, "b").unwrap(), Decimal::from(437));
        assert_eq!(parse_price(&obj, "c").unwrap(), Decimal::from(150));
    }

    #[test]
    fn test_parse_price_rejects_bad_values() {
        let obj = json!({"empty": "", "text": "abc", "zero": "0", "neg": "-1"});
        assert!(parse_price(&obj, "empty").is_err());
        assert!(parse_price(&obj, "text").is_err());
        assert!(parse_price(&obj, "zero").is_err());
        assert!(parse_price(&obj, "neg").is_err());
        assert!(parse_price(&obj, "missing").is_err());
    }

    #[test]
    fn test_collect_extra_marks_missing() {
        let obj = json!({"mark_price": "440.1", "funding_rate": ""});
        let extra = collect_extra(
            &obj,
            &[
                ("mark_price", "mark_price"),
                ("funding_rate", "funding_rate"),
                ("index_price", "index_price"),
            ],
        );
        assert_eq!(extra.get("mark_price"), Some("440.1"));
        assert_eq!(extra.get("funding_rate"), None);
        assert_eq!(extra.get("index_price"), None);
        assert_eq!(extra.len(), 3);
    }
}
