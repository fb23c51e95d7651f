//! Error types for feed operations.

use spread_core::{Exchange, MarketType};
use thiserror::Error;

/// Errors that can occur during feed operations.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("WebSocket connection failed: {0}")]
    ConnectionFailed(String),

    #[error("WebSocket disconnected: {0}")]
    Disconnected(String),

    #[error("Failed to parse message: {0}")]
    ParseError(String),

    #[error("Subscription failed: {0}")]
    SubscriptionFailed(String),

    #[error("{0} has no {1} feed")]
    UnsupportedMarket(Exchange, MarketType),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Channel closed")]
    ChannelClosed,
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::ConnectionFailed(err.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::ParseError(err.to_string())
    }
}

impl From<rust_decimal::Error> for FeedError {
    fn from(err: rust_decimal::Error) -> Self {
        FeedError::ParseError(err.to_string())
    }
}

impl FeedError {
    /// Returns true if this error is transient and likely to succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FeedError::ConnectionFailed(_)
                | FeedError::Disconnected(_)
                | FeedError::Timeout(_)
                | FeedError::SubscriptionFailed(_)
        )
    }
}
