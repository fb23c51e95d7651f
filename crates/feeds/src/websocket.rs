//! WebSocket client for exchange connections.

use crate::adapter::ExchangeAdapter;
use crate::retry::ReconnectPolicy;
use crate::{FeedConfig, FeedError};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Message received from WebSocket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    /// Text message (JSON).
    Text(String),
    /// Connection established (first time).
    Connected,
    /// Connection closed.
    Disconnected,
    /// Connected again after a disconnection.
    Reconnected,
    /// Error occurred.
    Error(String),
}

/// WebSocket client for a single (exchange, market) connection.
///
/// [`WsClient::run`] never returns while the receiving side is alive:
/// every connection loss is followed by a wait chosen by the reconnect
/// policy and a fresh connect plus resubscribe.
pub struct WsClient {
    config: FeedConfig,
    adapter: Arc<dyn ExchangeAdapter>,
    tx: mpsc::Sender<WsMessage>,
    policy: Box<dyn ReconnectPolicy>,
    has_connected_once: bool,
}

impl WsClient {
    pub fn new(
        config: FeedConfig,
        adapter: Arc<dyn ExchangeAdapter>,
        tx: mpsc::Sender<WsMessage>,
        policy: Box<dyn ReconnectPolicy>,
    ) -> Self {
        Self {
            config,
            adapter,
            tx,
            policy,
            has_connected_once: false,
        }
    }

    /// Connect, subscribe and forward frames until the receiver is dropped.
    pub async fn run(mut self, subscribe_msgs: Vec<String>) -> Result<(), FeedError> {
        let id = self.config.id();
        let mut reconnect_attempts = 0u32;

        loop {
            let connection_start = Instant::now();

            let err = match self.connect_and_handle(&subscribe_msgs).await {
                Ok(()) => FeedError::Disconnected("Closed by server".to_string()),
                Err(FeedError::ChannelClosed) => {
                    debug!("{}: receiver dropped, stopping client", id);
                    return Err(FeedError::ChannelClosed);
                }
                Err(e) => e,
            };

            let connected_for = connection_start.elapsed();
            reconnect_attempts = reconnect_attempts.saturating_add(1);
            let delay = self.policy.next_delay(reconnect_attempts, connected_for);

            if err.is_transient() {
                warn!(
                    "{}: {} after {:?}. Reconnecting in {:.1}s (attempt #{})",
                    id,
                    err,
                    connected_for,
                    delay.as_secs_f64(),
                    reconnect_attempts
                );
            } else {
                error!(
                    "{}: {}. Reconnecting in {:.1}s (attempt #{})",
                    id,
                    err,
                    delay.as_secs_f64(),
                    reconnect_attempts
                );
            }

            if self.tx.send(WsMessage::Error(err.to_string())).await.is_err()
                || self.tx.send(WsMessage::Disconnected).await.is_err()
            {
                return Err(FeedError::ChannelClosed);
            }

            tokio::time::sleep(delay).await;
        }
    }

    async fn emit(&self, msg: WsMessage) -> Result<(), FeedError> {
        self.tx.send(msg).await.map_err(|_| FeedError::ChannelClosed)
    }

    async fn connect_and_handle(&mut self, subscribe_msgs: &[String]) -> Result<(), FeedError> {
        let id = self.config.id();
        debug!("Connecting to {}: {}", id, self.config.ws_url);

        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let (ws_stream, response) =
            match tokio::time::timeout(connect_timeout, connect_async(self.config.ws_url.as_str())).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(FeedError::Timeout(format!(
                        "connect to {} timed out after {:?}",
                        self.config.ws_url, connect_timeout
                    )))
                }
            };
        debug!("{}: Connected (status: {:?})", id, response.status());

        if self.has_connected_once {
            info!("{}: reconnected", id);
            self.emit(WsMessage::Reconnected).await?;
        } else {
            info!("{}: connected", id);
            self.emit(WsMessage::Connected).await?;
        }
        self.has_connected_once = true;

        let (mut write, mut read) = ws_stream.split();

        debug!("{}: Sending {} subscription message(s)", id, subscribe_msgs.len());
        for (i, msg) in subscribe_msgs.iter().enumerate() {
            if let Err(e) = write.send(Message::Text(msg.clone())).await {
                error!("{}: Failed to send subscription: {}", id, e);
                return Err(FeedError::SubscriptionFailed(e.to_string()));
            }
            if i + 1 < subscribe_msgs.len() {
                tokio::time::sleep(Duration::from_millis(self.config.subscribe_delay_ms)).await;
            }
        }

        let ping_interval = Duration::from_millis(self.config.ping_interval_ms);
        let mut ping_timer = tokio::time::interval(ping_interval);
        // First tick completes immediately
        ping_timer.tick().await;

        // Silent disconnects: the socket looks open but nothing arrives
        let stale_timeout = Duration::from_millis(self.config.stale_timeout_ms);
        let mut last_message_time = Instant::now();

        let pong_timeout = Duration::from_millis(self.config.pong_timeout_ms);
        let mut awaiting_pong = false;
        let mut ping_sent_time = Instant::now();

        loop {
            if last_message_time.elapsed() > stale_timeout {
                warn!(
                    "{}: No messages received for {:?}, forcing reconnect",
                    id,
                    last_message_time.elapsed()
                );
                return Err(FeedError::Disconnected(
                    "Stale connection - no messages received".to_string(),
                ));
            }

            if awaiting_pong && ping_sent_time.elapsed() > pong_timeout {
                warn!("{}: No PONG received for {:?} after PING, forcing reconnect", id, ping_sent_time.elapsed());
                return Err(FeedError::Disconnected("Ping timeout - no PONG received".to_string()));
            }

            tokio::select! {
                msg = read.next() => {
                    last_message_time = Instant::now();

                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if self.adapter.is_pong(&text) {
                                awaiting_pong = false;
                                debug!("{}: Received pong (latency: {:?})", id, ping_sent_time.elapsed());
                                continue;
                            }
                            self.emit(WsMessage::Text(text)).await?;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = write.send(Message::Pong(data)).await {
                                error!("{}: Failed to send PONG: {}", id, e);
                                return Err(FeedError::ConnectionFailed(format!("PONG send failed: {}", e)));
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            awaiting_pong = false;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!("{}: Received close frame: {:?}", id, frame);
                            return Ok(());
                        }
                        Some(Ok(other)) => {
                            debug!("{}: Ignoring frame: {:?}", id, other);
                        }
                        Some(Err(e)) => {
                            error!("{}: WebSocket read error: {}", id, e);
                            return Err(FeedError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            return Err(FeedError::Disconnected("Stream ended".to_string()));
                        }
                    }
                }
                _ = ping_timer.tick() => {
                    if let Err(e) = write.send(Message::Ping(Vec::new())).await {
                        error!("{}: Failed to send WS PING: {}", id, e);
                        return Err(FeedError::ConnectionFailed(format!("WS PING failed: {}", e)));
                    }
                    if let Some(ping) = self.adapter.ping_message(self.config.market) {
                        if let Err(e) = write.send(Message::Text(ping)).await {
                            error!("{}: Failed to send app-level ping: {}", id, e);
                            return Err(FeedError::ConnectionFailed(format!("App ping failed: {}", e)));
                        }
                    }
                    if !awaiting_pong {
                        awaiting_pong = true;
                        ping_sent_time = Instant::now();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::adapter_for;
    use crate::retry::FixedDelay;
    use spread_core::{Exchange, MarketType};

    #[test]
    fn test_ws_message_variants() {
        let msg = WsMessage::Text("test".to_string());
        assert!(matches!(msg, WsMessage::Text(_)));

        let msg = WsMessage::Connected;
        assert!(matches!(msg, WsMessage::Connected));
    }

    #[tokio::test]
    async fn test_ws_client_creation() {
        let config = FeedConfig::for_market(Exchange::GateIO, MarketType::Futures).unwrap();
        let (tx, _rx) = mpsc::channel(100);
        let client = WsClient::new(
            config,
            adapter_for(Exchange::GateIO),
            tx,
            Box::new(FixedDelay::default()),
        );
        assert!(!client.has_connected_once);
    }

    #[tokio::test]
    async fn test_ws_client_stops_when_receiver_dropped() {
        // Nothing listens on port 1: connect fails and the error event has no receiver
        let config = FeedConfig {
            ws_url: "ws://127.0.0.1:1".to_string(),
            connect_timeout_ms: 500,
            ..Default::default()
        };
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let client = WsClient::new(
            config,
            adapter_for(Exchange::GateIO),
            tx,
            Box::new(FixedDelay::new(Duration::from_millis(10))),
        );
        let result = client.run(Vec::new()).await;
        assert!(matches!(result, Err(FeedError::ChannelClosed)));
    }
}
