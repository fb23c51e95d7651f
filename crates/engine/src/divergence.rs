//! Spot vs reference-futures divergence.
//!
//! Everything here is pure: no clocks, no I/O. A spot sample with a
//! non-positive price is "not ready" and simply skipped.

use crate::{PriceBoard, Thresholds};
use rust_decimal::Decimal;
use spread_core::{AlertLevel, Exchange, MarketType, PriceSample, ThresholdMode};

/// Divergence of one spot price from the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divergence {
    /// `futures - spot`
    pub diff: Decimal,
    /// `diff / spot * 100`
    pub diff_pct: Decimal,
}

impl Divergence {
    /// `None` when the spot price is zero or negative, or the arithmetic overflows.
    pub fn compute(futures: Decimal, spot: Decimal) -> Option<Self> {
        if spot <= Decimal::ZERO {
            return None;
        }
        let diff = futures.checked_sub(spot)?;
        let diff_pct = diff.checked_div(spot)?.checked_mul(Decimal::ONE_HUNDRED)?;
        Some(Self { diff, diff_pct })
    }

    /// Value compared against the threshold in `mode`.
    pub fn compared_value(&self, mode: ThresholdMode) -> Decimal {
        match mode {
            ThresholdMode::Percentage => self.diff_pct.abs(),
            ThresholdMode::Absolute => self.diff.abs(),
        }
    }

    /// Meeting the threshold exactly is a breach.
    pub fn breaches(&self, mode: ThresholdMode, threshold: Decimal) -> bool {
        self.compared_value(mode) >= threshold
    }
}

/// A spot venue whose divergence breached the threshold in this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceededEntry {
    pub exchange: Exchange,
    pub spot_price: Decimal,
    pub diff: Decimal,
    pub diff_pct: Decimal,
}

/// One spot venue compared against the reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub exchange: Exchange,
    pub spot_price: Decimal,
    pub divergence: Divergence,
    pub breached: bool,
}

/// Result of evaluating one symbol against the board.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub symbol: String,
    /// Reference futures sample
    pub reference: PriceSample,
    pub threshold: Decimal,
    pub observations: Vec<Observation>,
    pub exceeded: Vec<ExceededEntry>,
    pub level: Option<AlertLevel>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolEvaluation {
    /// No usable reference futures sample yet
    Cold,
    Evaluated(Evaluation),
}

/// Compare every enabled exchange's spot sample against the reference
/// futures sample for `symbol`.
pub fn evaluate_symbol(
    board: &PriceBoard,
    symbol: &str,
    reference_exchange: Exchange,
    exchanges: &[Exchange],
    thresholds: &Thresholds,
) -> SymbolEvaluation {
    let reference = match board.get(reference_exchange, symbol, MarketType::Futures) {
        Some(sample) if sample.is_ready() => sample,
        _ => return SymbolEvaluation::Cold,
    };

    let threshold = thresholds.for_symbol(symbol);
    let mut observations = Vec::with_capacity(exchanges.len());
    let mut exceeded = Vec::new();

    for &exchange in exchanges {
        let Some(spot) = board.get(exchange, symbol, MarketType::Spot) else {
            continue;
        };
        let Some(divergence) = Divergence::compute(reference.price, spot.price) else {
            continue;
        };

        let breached = divergence.breaches(thresholds.mode, threshold);
        if breached {
            exceeded.push(ExceededEntry {
                exchange,
                spot_price: spot.price,
                diff: divergence.diff,
                diff_pct: divergence.diff_pct,
            });
        }
        observations.push(Observation {
            exchange,
            spot_price: spot.price,
            divergence,
            breached,
        });
    }

    let level = AlertLevel::from_breach_count(exceeded.len());
    SymbolEvaluation::Evaluated(Evaluation {
        symbol: symbol.to_string(),
        reference,
        threshold,
        observations,
        exceeded,
        level,
    })
}
