//! Feed message types for communication between runners and the ingest task.
//!
//! Runners parse exchange frames and send [`FeedMessage`]s; the consumer
//! writes samples to the price board and logs lifecycle events.

use spread_core::{Exchange, MarketType, PriceSample};
use std::fmt;

/// Identifies one connection: an exchange's spot or futures stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedId {
    pub exchange: Exchange,
    pub market: MarketType,
}

impl FeedId {
    pub fn new(exchange: Exchange, market: MarketType) -> Self {
        Self { exchange, market }
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.exchange, self.market)
    }
}

/// Message sent from feed runners to the consumer.
#[derive(Debug, Clone)]
pub enum FeedMessage {
    /// Normalized ticker update
    Sample(PriceSample),
    /// Connection lifecycle event
    Event(ConnectionEvent),
}

/// WebSocket connection lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Initial connection established
    Connected(FeedId),
    /// Connection lost; a reconnect is scheduled
    Disconnected(FeedId),
    /// Connected again after a disconnection
    Reconnected(FeedId),
    /// Non-fatal error
    Error(FeedId, String),
}

impl ConnectionEvent {
    pub fn feed(&self) -> FeedId {
        match self {
            ConnectionEvent::Connected(id)
            | ConnectionEvent::Disconnected(id)
            | ConnectionEvent::Reconnected(id)
            | ConnectionEvent::Error(id, _) => *id,
        }
    }
}

impl From<PriceSample> for FeedMessage {
    fn from(sample: PriceSample) -> Self {
        FeedMessage::Sample(sample)
    }
}

impl From<ConnectionEvent> for FeedMessage {
    fn from(event: ConnectionEvent) -> Self {
        FeedMessage::Event(event)
    }
}
