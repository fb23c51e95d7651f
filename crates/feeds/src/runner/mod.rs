//! Feed runner that turns WebSocket frames into [`FeedMessage`]s.
//!
//! The runner:
//! - Receives `WsMessage` from a WebSocket client
//! - Parses ticker frames with the exchange adapter
//! - Maps wire symbols back to canonical symbols
//! - Emits `FeedMessage::Sample` or `FeedMessage::Event`
//!
//! Frames that fail to parse are logged and dropped; they never reach the
//! consumer.

use crate::adapter::ExchangeAdapter;
use crate::message::{ConnectionEvent, FeedId, FeedMessage};
use crate::symbol_mapping::SymbolMap;
use crate::WsMessage;
use spread_core::PriceSample;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Sender type for feed messages.
pub type FeedSender = mpsc::Sender<FeedMessage>;

/// Forward WebSocket connection lifecycle events.
///
/// Returns `true` if the message was a connection event (caller should continue to next message).
/// Returns `false` if the message is data that should be processed.
pub fn handle_connection_event(msg: &WsMessage, id: FeedId, tx: &FeedSender) -> bool {
    let event = match msg {
        WsMessage::Connected => ConnectionEvent::Connected(id),
        WsMessage::Reconnected => ConnectionEvent::Reconnected(id),
        WsMessage::Disconnected => ConnectionEvent::Disconnected(id),
        WsMessage::Error(e) => ConnectionEvent::Error(id, e.clone()),
        WsMessage::Text(_) => return false,
    };
    let _ = tx.try_send(event.into());
    true
}

/// Parse one text frame into samples for the tracked symbols.
pub fn samples_from_text(
    id: FeedId,
    adapter: &dyn ExchangeAdapter,
    symbols: &SymbolMap,
    text: &str,
) -> Vec<PriceSample> {
    let tickers = match adapter.parse_tickers(id.market, text) {
        Ok(tickers) => tickers,
        Err(e) => {
            warn!("{}: discarding frame: {}", id, e);
            return Vec::new();
        }
    };

    tickers
        .into_iter()
        .filter_map(|t| match symbols.canonical(&t.symbol) {
            Some(canonical) => Some(
                PriceSample::new(id.exchange, canonical, id.market, t.price).with_extra(t.extra),
            ),
            None => {
                debug!("{}: ignoring untracked symbol {}", id, t.symbol);
                None
            }
        })
        .collect()
}

/// Run the feed processor until either side of the pipeline closes.
pub async fn run_feed(
    id: FeedId,
    adapter: Arc<dyn ExchangeAdapter>,
    symbols: SymbolMap,
    mut rx: mpsc::Receiver<WsMessage>,
    tx: FeedSender,
) {
    debug!("Starting {} feed runner", id);

    while let Some(msg) = rx.recv().await {
        if handle_connection_event(&msg, id, &tx) {
            continue;
        }

        if let WsMessage::Text(text) = msg {
            for sample in samples_from_text(id, adapter.as_ref(), &symbols, &text) {
                if tx.send(sample.into()).await.is_err() {
                    debug!("{} feed runner: consumer gone", id);
                    return;
                }
            }
        }
    }

    debug!("{} feed runner stopped", id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::adapter_for;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use spread_core::{aux, Exchange, MarketType};
    use std::str::FromStr;

    fn bybit_symbols() -> SymbolMap {
        SymbolMap::new(&["TSLAX_USDT".to_string()], |s| s.replace('_', ""))
    }

    #[test]
    fn test_samples_use_canonical_symbol() {
        let id = FeedId::new(Exchange::Bybit, MarketType::Spot);
        let adapter = adapter_for(Exchange::Bybit);
        let text = r#"{"topic":"tickers.TSLAXUSDT","type":"snapshot","data":{"symbol":"TSLAXUSDT","lastPrice":"437","volume24h":"12"}}"#;

        let samples = samples_from_text(id, adapter.as_ref(), &bybit_symbols(), text);

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].symbol, "TSLAX_USDT");
        assert_eq!(samples[0].exchange, Exchange::Bybit);
        assert_eq!(samples[0].market, MarketType::Spot);
        assert_eq!(samples[0].price, Decimal::from(437));
        assert_eq!(samples[0].extra.get(aux::VOLUME_24H), Some("12"));
    }

    #[test]
    fn test_samples_skip_untracked_and_malformed() {
        let id = FeedId::new(Exchange::Bybit, MarketType::Spot);
        let adapter = adapter_for(Exchange::Bybit);
        let untracked = r#"{"topic":"tickers.AAPLXUSDT","data":{"symbol":"AAPLXUSDT","lastPrice":"200"}}"#;
        let malformed = r#"{"topic":"tickers.TSLAXUSDT","data":{"symbol":"TSLAXUSDT","lastPrice":"n/a"}}"#;

        assert!(samples_from_text(id, adapter.as_ref(), &bybit_symbols(), untracked).is_empty());
        assert!(samples_from_text(id, adapter.as_ref(), &bybit_symbols(), malformed).is_empty());
    }

    #[tokio::test]
    async fn test_run_feed_forwards_events_and_samples() {
        let id = FeedId::new(Exchange::GateIO, MarketType::Futures);
        let symbols = SymbolMap::new(&["TSLAX_USDT".to_string()], str::to_string);
        let (ws_tx, ws_rx) = mpsc::channel(10);
        let (tx, mut rx) = mpsc::channel(10);

        let handle = tokio::spawn(run_feed(id, adapter_for(Exchange::GateIO), symbols, ws_rx, tx));

        ws_tx.send(WsMessage::Connected).await.unwrap();
        ws_tx
            .send(WsMessage::Text(
                r#"{"channel":"futures.tickers","event":"update","result":[{"contract":"TSLAX_USDT","last":"440.42","mark_price":"440.4"}]}"#
                    .to_string(),
            ))
            .await
            .unwrap();
        ws_tx.send(WsMessage::Disconnected).await.unwrap();
        drop(ws_tx);

        match rx.recv().await.unwrap() {
            FeedMessage::Event(event) => assert_eq!(event, ConnectionEvent::Connected(id)),
            other => panic!("Expected Connected, got {:?}", other),
        }
        match rx.recv().await.unwrap() {
            FeedMessage::Sample(sample) => {
                assert_eq!(sample.symbol, "TSLAX_USDT");
                assert_eq!(sample.price, Decimal::from_str("440.42").unwrap());
                assert_eq!(sample.extra.get(aux::MARK_PRICE), Some("440.4"));
            }
            other => panic!("Expected Sample, got {:?}", other),
        }
        match rx.recv().await.unwrap() {
            FeedMessage::Event(event) => assert_eq!(event, ConnectionEvent::Disconnected(id)),
            other => panic!("Expected Disconnected, got {:?}", other),
        }

        handle.await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
