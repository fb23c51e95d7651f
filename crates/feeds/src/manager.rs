//! Feed configuration and lifecycle.
//!
//! [`FeedManager`] spawns one WebSocket client and one runner per
//! (exchange, market) pair, all publishing into a shared [`FeedSender`].

use crate::adapter::{adapter_for, ExchangeAdapter};
use crate::message::FeedId;
use crate::retry::{FixedDelay, ReconnectPolicy};
use crate::runner::{run_feed, FeedSender};
use crate::symbol_mapping::SymbolMap;
use crate::websocket::WsClient;
use crate::FeedError;
use spread_core::{Exchange, MarketType};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Configuration for a feed connection.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// WebSocket URL
    pub ws_url: String,
    pub exchange: Exchange,
    pub market: MarketType,
    /// Keep-alive ping interval (ms)
    pub ping_interval_ms: u64,
    /// How long to wait for a pong after a ping (ms)
    pub pong_timeout_ms: u64,
    /// Reconnect when nothing at all arrives for this long (ms)
    pub stale_timeout_ms: u64,
    /// Connection timeout (ms)
    pub connect_timeout_ms: u64,
    /// Pause between subscribe frames (ms)
    pub subscribe_delay_ms: u64,
    /// Capacity of the raw frame channel between client and runner
    pub channel_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ws_url: String::new(),
            exchange: Exchange::GateIO,
            market: MarketType::Spot,
            ping_interval_ms: 20_000,
            pong_timeout_ms: 30_000,
            stale_timeout_ms: 120_000,
            connect_timeout_ms: 10_000,
            subscribe_delay_ms: 50,
            channel_capacity: 1000,
        }
    }
}

impl FeedConfig {
    /// Create config for one market of an exchange.
    pub fn for_market(exchange: Exchange, market: MarketType) -> Result<Self, FeedError> {
        let ws_url = adapter_for(exchange).ws_url(market)?.to_string();
        Ok(Self {
            ws_url,
            exchange,
            market,
            ..Default::default()
        })
    }

    pub fn id(&self) -> FeedId {
        FeedId::new(self.exchange, self.market)
    }
}

/// Tasks backing one running feed.
pub struct FeedHandle {
    pub id: FeedId,
    client: JoinHandle<()>,
    runner: JoinHandle<()>,
}

impl FeedHandle {
    pub fn abort(&self) {
        self.client.abort();
        self.runner.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.client.is_finished() && self.runner.is_finished()
    }
}

/// Spawn a WebSocket client plus runner for `config`, subscribed to the
/// given canonical symbols.
pub fn spawn_feed(
    config: FeedConfig,
    symbols: &[String],
    tx: FeedSender,
    policy: Box<dyn ReconnectPolicy>,
) -> Result<FeedHandle, FeedError> {
    let adapter: Arc<dyn ExchangeAdapter> = adapter_for(config.exchange);
    if !adapter.supports(config.market) {
        return Err(FeedError::UnsupportedMarket(config.exchange, config.market));
    }

    let symbol_map = SymbolMap::new(symbols, |s| adapter.wire_symbol(s));
    if symbol_map.is_empty() {
        return Err(FeedError::SubscriptionFailed(format!(
            "{}: no symbols to subscribe",
            config.id()
        )));
    }
    let subscribe_msgs = adapter.subscribe_messages(config.market, &symbol_map.wire_symbols());

    let id = config.id();
    info!(
        "{}: subscribing to {} symbol(s) via {} ({})",
        id,
        symbol_map.len(),
        config.ws_url,
        policy.name()
    );

    let (ws_tx, ws_rx) = mpsc::channel(config.channel_capacity);
    let client = WsClient::new(config, adapter.clone(), ws_tx, policy);

    let client = tokio::spawn(async move {
        if let Err(e) = client.run(subscribe_msgs).await {
            error!("{}: WebSocket client stopped: {}", id, e);
        }
    });
    let runner = tokio::spawn(run_feed(id, adapter, symbol_map, ws_rx, tx));

    Ok(FeedHandle { id, client, runner })
}

/// Owns every running feed of the process.
pub struct FeedManager {
    tx: FeedSender,
    handles: Vec<FeedHandle>,
}

impl FeedManager {
    pub fn new(tx: FeedSender) -> Self {
        Self {
            tx,
            handles: Vec::new(),
        }
    }

    /// Spawn a feed with the default fixed reconnect delay.
    pub fn spawn(
        &mut self,
        exchange: Exchange,
        market: MarketType,
        symbols: &[String],
    ) -> Result<FeedId, FeedError> {
        self.spawn_with_policy(exchange, market, symbols, Box::new(FixedDelay::default()))
    }

    pub fn spawn_with_policy(
        &mut self,
        exchange: Exchange,
        market: MarketType,
        symbols: &[String],
        policy: Box<dyn ReconnectPolicy>,
    ) -> Result<FeedId, FeedError> {
        let config = FeedConfig::for_market(exchange, market)?;
        let handle = spawn_feed(config, symbols, self.tx.clone(), policy)?;
        let id = handle.id;
        self.handles.push(handle);
        Ok(id)
    }

    pub fn feeds(&self) -> Vec<FeedId> {
        self.handles.iter().map(|h| h.id).collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Abort every feed task.
    pub fn shutdown(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for FeedManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
