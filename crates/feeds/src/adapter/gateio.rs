use serde::Deserialize;
use serde_json::Value;
use spread_core::{aux, Exchange, MarketType};

use super::{collect_extra, parse_price, ExchangeAdapter, WireTicker};
use crate::FeedError;
use tracing::warn;

const SPOT_URL: &str = "wss://api.gateio.ws/ws/v4/";
const FUTURES_URL: &str = "wss://fx-ws.gateio.ws/v4/ws/usdt";

const SPOT_EXTRA: &[(&str, &str)] = &[
    ("change_percentage", aux::CHANGE_24H),
    ("high_24h", aux::HIGH_24H),
    ("low_24h", aux::LOW_24H),
    ("quote_volume", aux::VOLUME_24H),
];

const FUTURES_EXTRA: &[(&str, &str)] = &[
    ("mark_price", aux::MARK_PRICE),
    ("index_price", aux::INDEX_PRICE),
    ("funding_rate", aux::FUNDING_RATE),
    ("change_percentage", aux::CHANGE_24H),
    ("high_24h", aux::HIGH_24H),
    ("low_24h", aux::LOW_24H),
    ("volume_24h", aux::VOLUME_24H),
];

/// Gate.io spot (`spot.tickers`) and USDT-margined futures (`futures.tickers`).
///
/// Wire symbols are the canonical `BASE_QUOTE` form unchanged.
pub struct GateIOAdapter;

#[derive(Debug, Deserialize)]
struct GateIOEnvelope {
    #[serde(default)]
    channel: String,
    #[serde(default)]
    event: String,
    #[serde(default)]
    result: Value,
}

impl GateIOAdapter {
    fn ticker_channel(market: MarketType) -> &'static str {
        match market {
            MarketType::Spot => "spot.tickers",
            MarketType::Futures => "futures.tickers",
        }
    }

    fn symbol_field(market: MarketType) -> &'static str {
        match market {
            MarketType::Spot => "currency_pair",
            MarketType::Futures => "contract",
        }
    }

    fn parse_one(market: MarketType, obj: &Value) -> Result<WireTicker, FeedError> {
        let key = Self::symbol_field(market);
        let symbol = obj
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| FeedError::ParseError(format!("Gate.io ticker without '{}'", key)))?;
        let price = parse_price(obj, "last")?;
        let extra = match market {
            MarketType::Spot => collect_extra(obj, SPOT_EXTRA),
            MarketType::Futures => collect_extra(obj, FUTURES_EXTRA),
        };
        Ok(WireTicker {
            symbol: symbol.to_uppercase(),
            price,
            extra,
        })
    }

    /// Parse each contract on its own so one bad entry does not drop the
    /// rest of the batch. Fails only when nothing in a non-empty batch parses.
    fn parse_batch(market: MarketType, items: &[Value]) -> Result<Vec<WireTicker>, FeedError> {
        let mut tickers = Vec::with_capacity(items.len());
        let mut first_err = None;
        for obj in items {
            match Self::parse_one(market, obj) {
                Ok(ticker) => tickers.push(ticker),
                Err(e) => {
                    warn!("Gate.io {}: skipping ticker: {}", market, e);
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) if tickers.is_empty() => Err(e),
            _ => Ok(tickers),
        }
    }
}

fn unix_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl ExchangeAdapter for GateIOAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::GateIO
    }

    fn supports(&self, _market: MarketType) -> bool {
        true
    }

    fn ws_url(&self, market: MarketType) -> Result<&'static str, FeedError> {
        Ok(match market {
            MarketType::Spot => SPOT_URL,
            MarketType::Futures => FUTURES_URL,
        })
    }

    fn wire_symbol(&self, canonical: &str) -> String {
        canonical.to_uppercase()
    }

    fn subscribe_messages(&self, market: MarketType, symbols: &[String]) -> Vec<String> {
        if symbols.is_empty() {
            return Vec::new();
        }
        let msg = serde_json::json!({
            "time": unix_secs(),
            "channel": Self::ticker_channel(market),
            "event": "subscribe",
            "payload": symbols,
        });
        vec![msg.to_string()]
    }

    fn ping_message(&self, market: MarketType) -> Option<String> {
        let channel = match market {
            MarketType::Spot => "spot.ping",
            MarketType::Futures => "futures.ping",
        };
        Some(format!(r#"{{"time": {}, "channel": "{}"}}"#, unix_secs(), channel))
    }

    fn is_pong(&self, text: &str) -> bool {
        text.contains("\"channel\":\"spot.pong\"") || text.contains("\"channel\":\"futures.pong\"")
    }

    fn parse_tickers(&self, market: MarketType, text: &str) -> Result<Vec<WireTicker>, FeedError> {
        let msg: GateIOEnvelope = serde_json::from_str(text)?;

        if msg.channel != Self::ticker_channel(market) || msg.event != "update" {
            return Ok(Vec::new());
        }

        match &msg.result {
            Value::Array(items) => Self::parse_batch(market, items),
            obj @ Value::Object(_) => Ok(vec![Self::parse_one(market, obj)?]),
            _ => Err(FeedError::ParseError("Gate.io ticker without result".to_string())),
        }
    }
}
