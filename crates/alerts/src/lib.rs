//! Outbound messaging for the spread monitor.
//!
//! This crate provides:
//! - Telegram notifier for divergence alerts (plus a log-only fallback)
//! - OpenWeatherMap lookup
//! - The assistant bot: /start, /help, /weather and a daily greeting

pub mod bot;
pub mod config;
pub mod http;
pub mod telegram;
pub mod weather;

pub use bot::{AssistantBot, Command, GreetingSchedule};
pub use config::{TelegramConfig, WeatherConfig};
pub use telegram::{LogOnlyNotifier, TelegramError, TelegramNotifier};
pub use weather::{WeatherClient, WeatherError, WeatherReport};
