//! Shared price board.
//!
//! Latest sample per (exchange, symbol, market). Writers are the ingest
//! task; the divergence monitor reads cells one at a time. No lock is ever
//! held across an await point or a network call.

use dashmap::DashMap;
use spread_core::{Exchange, MarketType, PriceKey, PriceSample};
use std::sync::Arc;

/// Thread-safe latest-value table, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct PriceBoard {
    cells: Arc<DashMap<PriceKey, PriceSample>>,
}

impl PriceBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the cell for the sample's key. No history is kept.
    pub fn update(&self, sample: PriceSample) {
        self.cells.insert(sample.key(), sample);
    }

    /// Copy of one cell.
    pub fn get(&self, exchange: Exchange, symbol: &str, market: MarketType) -> Option<PriceSample> {
        let key = PriceKey::new(exchange, symbol, market);
        self.cells.get(&key).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
