//! Spot vs futures divergence monitor.
//!
//! Streams tickers from the configured exchanges, compares each spot price
//! against the reference futures price and sends tiered Telegram alerts.

mod config;
mod ingest;

use clap::Parser;
use config::MonitorConfig;
use spread_alerts::{LogOnlyNotifier, TelegramNotifier};
use spread_engine::{DivergenceMonitor, Notifier, PriceBoard};
use spread_feeds::FeedManager;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Capacity of the shared feed channel.
const FEED_CHANNEL_CAPACITY: usize = 10_000;

#[derive(Parser, Debug)]
#[command(name = "price-monitor")]
#[command(about = "Spot vs futures price divergence monitor", long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Load environment from this file instead of ./.env
    #[arg(long)]
    env_file: Option<String>,

    /// Log alerts instead of sending them to Telegram
    #[arg(long)]
    dry_run: bool,
}

fn init_logging(level: &str) {
    let fallback = level.parse::<Level>().unwrap_or(Level::INFO);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn load_env(path: Option<&str>) {
    let result = match path {
        Some(path) => dotenvy::from_filename(path).map(|_| ()),
        None => dotenvy::dotenv().map(|_| ()),
    };
    if let (Some(path), Err(e)) = (path, result) {
        eprintln!("Failed to load {}: {}", path, e);
    }
}

fn build_notifier(config: &MonitorConfig, dry_run: bool) -> Arc<dyn Notifier> {
    if dry_run {
        info!("Dry run: alerts are logged, not sent");
        return Arc::new(LogOnlyNotifier::dry_run());
    }

    match config.telegram.clone() {
        Some(telegram) => match TelegramNotifier::new(telegram) {
            Ok(notifier) => Arc::new(notifier),
            Err(e) => {
                error!("Failed to build Telegram client: {}", e);
                Arc::new(LogOnlyNotifier::unconfigured())
            }
        },
        None => {
            warn!("BOT_TOKEN or ADMIN_CHAT_ID not set, alerts will only be logged");
            Arc::new(LogOnlyNotifier::unconfigured())
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    load_env(args.env_file.as_deref());
    init_logging(&args.log_level);

    info!("Starting price-monitor");

    let config = match MonitorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let notifier = build_notifier(&config, args.dry_run);
    let board = PriceBoard::default();
    let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);

    let mut feeds = FeedManager::new(tx);
    for (exchange, market) in config.feed_plan() {
        match feeds.spawn(exchange, market, &config.symbols) {
            Ok(id) => info!("Started feed {}", id),
            Err(e) => warn!("Skipping {} {}: {}", exchange, market, e),
        }
    }
    if feeds.is_empty() {
        error!("No feeds could be started");
        std::process::exit(1);
    }

    let ingest = tokio::spawn(ingest::run_ingest(rx, board.clone()));
    let monitor = DivergenceMonitor::new(config.monitor_settings(), board, notifier);
    let monitor = tokio::spawn(monitor.run());

    info!("Press Ctrl+C to stop...");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }
    warn!("Shutdown signal received");

    monitor.abort();
    feeds.shutdown();
    ingest.abort();

    info!("price-monitor stopped");
}
