use serde::Deserialize;
use serde_json::Value;
use spread_core::{aux, Exchange, MarketType};

use super::{collect_extra, field_str, parse_price, ExchangeAdapter, WireTicker};
use crate::FeedError;

const SPOT_URL: &str = "wss://stream.bybit.com/v5/public/spot";

/// Bybit caps the number of args per subscribe request.
const MAX_ARGS_PER_SUBSCRIBE: usize = 10;

const SPOT_EXTRA: &[(&str, &str)] = &[
    ("price24hPcnt", aux::CHANGE_24H),
    ("highPrice24h", aux::HIGH_24H),
    ("lowPrice24h", aux::LOW_24H),
    ("volume24h", aux::VOLUME_24H),
];

/// Bybit v5 public spot tickers. Futures are not consumed from Bybit.
///
/// Wire symbols drop the separator: "TSLAX_USDT" becomes "TSLAXUSDT".
pub struct BybitAdapter;

#[derive(Debug, Deserialize)]
struct BybitEnvelope {
    #[serde(default)]
    topic: String,
    #[serde(default)]
    data: Value,
}

impl ExchangeAdapter for BybitAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Bybit
    }

    fn supports(&self, market: MarketType) -> bool {
        market == MarketType::Spot
    }

    fn ws_url(&self, market: MarketType) -> Result<&'static str, FeedError> {
        match market {
            MarketType::Spot => Ok(SPOT_URL),
            MarketType::Futures => Err(FeedError::UnsupportedMarket(Exchange::Bybit, market)),
        }
    }

    fn wire_symbol(&self, canonical: &str) -> String {
        canonical.replace('_', "").to_uppercase()
    }

    fn subscribe_messages(&self, _market: MarketType, symbols: &[String]) -> Vec<String> {
        symbols
            .chunks(MAX_ARGS_PER_SUBSCRIBE)
            .map(|chunk| {
                let args: Vec<String> = chunk.iter().map(|s| format!("tickers.{}", s)).collect();
                serde_json::json!({ "op": "subscribe", "args": args }).to_string()
            })
            .collect()
    }

    fn ping_message(&self, _market: MarketType) -> Option<String> {
        Some(r#"{"op": "ping"}"#.to_string())
    }

    fn is_pong(&self, text: &str) -> bool {
        text.contains("\"op\":\"pong\"")
    }

    fn parse_tickers(&self, _market: MarketType, text: &str) -> Result<Vec<WireTicker>, FeedError> {
        let msg: BybitEnvelope = serde_json::from_str(text)?;

        if !msg.topic.starts_with("tickers.") {
            return Ok(Vec::new());
        }

        let data = &msg.data;
        let symbol = field_str(data, "symbol")
            .ok_or_else(|| FeedError::ParseError("Bybit ticker without symbol".to_string()))?;
        let price = parse_price(data, "lastPrice")?;

        Ok(vec![WireTicker {
            symbol: symbol.to_uppercase(),
            price,
            extra: collect_extra(data, SPOT_EXTRA),
        }])
    }
}
