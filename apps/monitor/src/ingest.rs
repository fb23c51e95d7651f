//! Feed-to-board ingest loop.

use spread_engine::PriceBoard;
use spread_feeds::{ConnectionEvent, FeedMessage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Apply feed messages to the board until every sender is gone.
///
/// Returns the number of samples applied.
pub async fn run_ingest(mut rx: mpsc::Receiver<FeedMessage>, board: PriceBoard) -> u64 {
    let mut applied = 0u64;

    while let Some(msg) = rx.recv().await {
        match msg {
            FeedMessage::Sample(sample) => {
                debug!(
                    "{} {} {}: {}",
                    sample.exchange, sample.market, sample.symbol, sample.price
                );
                board.update(sample);
                applied += 1;
            }
            FeedMessage::Event(event) => log_event(&event),
        }
    }

    info!("Ingest stopped after {} samples", applied);
    applied
}

fn log_event(event: &ConnectionEvent) {
    match event {
        ConnectionEvent::Connected(id) => info!("{}: connected", id),
        ConnectionEvent::Reconnected(id) => info!("{}: reconnected", id),
        ConnectionEvent::Disconnected(id) => warn!("{}: disconnected", id),
        ConnectionEvent::Error(id, e) => warn!("{}: {}", id, e),
    }
}
