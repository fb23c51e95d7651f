//! Alert message formatting (Telegram HTML).

use crate::ExceededEntry;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use spread_core::{aux, format_shanghai, AlertLevel, Exchange, PriceSample, ThresholdMode};

/// Everything needed to render one alert.
#[derive(Debug, Clone, Copy)]
pub struct AlertContext<'a> {
    pub symbol: &'a str,
    pub level: AlertLevel,
    /// Reference futures sample
    pub reference: &'a PriceSample,
    pub exceeded: &'a [ExceededEntry],
    pub mode: ThresholdMode,
    pub at: DateTime<Utc>,
}

/// Mean absolute percentage divergence and the largest one with its exchange.
pub fn divergence_stats(exceeded: &[ExceededEntry]) -> Option<(Decimal, Decimal, Exchange)> {
    let first = exceeded.first()?;
    let mut total = Decimal::ZERO;
    let mut max = (first.diff_pct.abs(), first.exchange);

    for entry in exceeded {
        let pct = entry.diff_pct.abs();
        total += pct;
        if pct > max.0 {
            max = (pct, entry.exchange);
        }
    }

    let mean = total / Decimal::from(exceeded.len() as u64);
    Some((mean, max.0, max.1))
}

/// Round half away from zero, then render exactly `dp` decimals.
pub fn fixed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", dp as usize, rounded)
}

/// Like [`fixed`] with an explicit sign.
pub fn signed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{:.*}", dp as usize, rounded.abs())
    } else {
        format!("+{:.*}", dp as usize, rounded.abs())
    }
}

pub fn format_diff(entry: &ExceededEntry, mode: ThresholdMode) -> String {
    match mode {
        ThresholdMode::Percentage => format!("{}%", signed(entry.diff_pct, 2)),
        ThresholdMode::Absolute => signed(entry.diff, 4),
    }
}

pub fn format_alert_message(ctx: &AlertContext<'_>) -> String {
    let (emoji, title) = match ctx.level {
        AlertLevel::Emergency => ("🚨🚨", "Critical price divergence"),
        AlertLevel::Warn => ("⚠️", "Price divergence warning"),
    };
    let reference_name = format!("{} futures", ctx.reference.exchange);

    let mut msg = format!(
        "{} <b>{}</b> [{}]\n\n<b>Symbol:</b> {}\n<b>{}:</b> ${}\n\n<b>Breaching exchanges ({}):</b>\n",
        emoji,
        title,
        ctx.level,
        ctx.symbol,
        reference_name,
        fixed(ctx.reference.price, 2),
        ctx.exceeded.len()
    );

    for entry in ctx.exceeded {
        msg.push_str(&format!(
            "📊 <b>{}</b> spot: ${}\n   Diff: {}\n\n",
            entry.exchange.key().to_uppercase(),
            fixed(entry.spot_price, 2),
            format_diff(entry, ctx.mode)
        ));
    }

    if ctx.level == AlertLevel::Emergency {
        if let Some((mean, max, max_exchange)) = divergence_stats(ctx.exceeded) {
            msg.push_str(&format!("<b>Average divergence:</b> {}%\n", fixed(mean, 2)));
            msg.push_str(&format!(
                "<b>Max divergence:</b> {}% ({})\n\n",
                fixed(max, 2),
                max_exchange.key().to_uppercase()
            ));
        }
    }

    let extra = &ctx.reference.extra;
    if [aux::MARK_PRICE, aux::INDEX_PRICE, aux::FUNDING_RATE]
        .iter()
        .any(|k| extra.get(k).is_some())
    {
        msg.push_str(&format!(
            "<b>{} details:</b>\n• Mark price: ${}\n• Index price: ${}\n• Funding rate: {}\n\n",
            reference_name,
            extra.display(aux::MARK_PRICE),
            extra.display(aux::INDEX_PRICE),
            extra.display(aux::FUNDING_RATE)
        ));
    }

    msg.push_str(&format!("⏰ {} (UTC+8)", format_shanghai(ctx.at)));
    msg
}
