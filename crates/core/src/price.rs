//! Price sample data structures.

use crate::{Exchange, MarketType};
use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder shown for auxiliary fields the exchange did not send.
pub const UNAVAILABLE: &str = "N/A";

/// Well-known auxiliary field keys.
pub mod aux {
    pub const MARK_PRICE: &str = "mark_price";
    pub const INDEX_PRICE: &str = "index_price";
    pub const FUNDING_RATE: &str = "funding_rate";
    pub const CHANGE_24H: &str = "change_24h";
    pub const HIGH_24H: &str = "high_24h";
    pub const LOW_24H: &str = "low_24h";
    pub const VOLUME_24H: &str = "volume_24h";
}

/// Exchange-specific auxiliary ticker fields.
///
/// A key that is present with `None` was expected but missing from the
/// exchange message; it is reported as unavailable rather than failing the
/// update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxFields(BTreeMap<CompactString, Option<String>>);

impl AuxFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, treating empty strings as unavailable.
    pub fn set(&mut self, key: &str, value: Option<&str>) {
        let value = value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        self.0.insert(CompactString::new(key), value);
    }

    /// Builder-style `set`.
    pub fn with(mut self, key: &str, value: Option<&str>) -> Self {
        self.set(key, value);
        self
    }

    /// Get a field value if the exchange sent it.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_deref())
    }

    /// Get a field for display, falling back to [`UNAVAILABLE`].
    pub fn display(&self, key: &str) -> &str {
        self.get(key).unwrap_or(UNAVAILABLE)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Board key: (exchange, canonical symbol, market type).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PriceKey {
    pub exchange: Exchange,
    pub symbol: CompactString,
    pub market: MarketType,
}

impl PriceKey {
    pub fn new(exchange: Exchange, symbol: &str, market: MarketType) -> Self {
        Self {
            exchange,
            symbol: CompactString::new(symbol),
            market,
        }
    }
}

/// Latest ticker observation for one (exchange, symbol, market) cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub exchange: Exchange,
    /// Canonical symbol, e.g. "TSLAX_USDT"
    pub symbol: CompactString,
    pub market: MarketType,
    /// Last traded price
    pub price: Decimal,
    /// Auxiliary fields (mark/index price, funding rate, 24h stats)
    pub extra: AuxFields,
}

impl PriceSample {
    pub fn new(exchange: Exchange, symbol: &str, market: MarketType, price: Decimal) -> Self {
        Self {
            exchange,
            symbol: CompactString::new(symbol),
            market,
            price,
            extra: AuxFields::new(),
        }
    }

    /// Attach auxiliary fields (builder pattern).
    pub fn with_extra(mut self, extra: AuxFields) -> Self {
        self.extra = extra;
        self
    }

    pub fn key(&self) -> PriceKey {
        PriceKey {
            exchange: self.exchange,
            symbol: self.symbol.clone(),
            market: self.market,
        }
    }

    /// A sample is usable for division only with a strictly positive price.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.price > Decimal::ZERO
    }
}
