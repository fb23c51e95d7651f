//! Telegram assistant bot: /start, /help, /weather and a daily greeting.

mod config;

use clap::Parser;
use config::AssistantConfig;
use spread_alerts::{AssistantBot, WeatherClient};
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "assistant-bot")]
#[command(about = "Telegram assistant bot with weather and daily greeting", long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Load environment from this file instead of ./.env
    #[arg(long)]
    env_file: Option<String>,
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

#[tokio::main]
async fn main() {
    let args = Args::parse();
    match args.env_file.as_deref() {
        Some(path) => {
            if let Err(e) = dotenvy::from_filename(path) {
                eprintln!("Failed to load {}: {}", path, e);
            }
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }
    init_logging(&args.log_level);

    let config = match AssistantConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    if config.admin_chat_id.is_none() {
        warn!("ADMIN_CHAT_ID not set, daily greeting disabled");
    }
    if config.weather.api_key.is_none() {
        warn!("WEATHER_API_KEY not set, weather lookups will fail");
    }

    let weather = match WeatherClient::new(config.weather.clone()) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build weather client: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Starting assistant-bot (greeting at {:02}:{:02} UTC+8)",
        config.greeting.hour, config.greeting.minute
    );

    let proxy = config.proxy.as_deref();
    let bot = match AssistantBot::new(&config.bot_token, proxy, weather, config.admin_chat_id) {
        Ok(bot) => bot.with_schedule(config.greeting),
        Err(e) => {
            error!("Failed to build Telegram client: {}", e);
            std::process::exit(1);
        }
    };
    Arc::new(bot).run().await;

    warn!("Shutdown signal received");
}
