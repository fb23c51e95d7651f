//! Assistant bot configuration.

use spread_alerts::config::proxy_from_lookup;
use spread_alerts::{GreetingSchedule, WeatherConfig};
use teloxide::types::ChatId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BOT_TOKEN is not set")]
    MissingToken,

    #[error("ADMIN_CHAT_ID: '{0}' is not a chat id")]
    ChatId(String),

    #[error("GREETING_TIME: '{0}' is not HH:MM")]
    GreetingTime(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssistantConfig {
    pub bot_token: String,
    /// Greetings are skipped when unset
    pub admin_chat_id: Option<ChatId>,
    pub greeting: GreetingSchedule,
    pub weather: WeatherConfig,
    /// Forward proxy for Bot API calls
    pub proxy: Option<String>,
}

fn parse_greeting_time(raw: &str) -> Result<GreetingSchedule, ConfigError> {
    let invalid = || ConfigError::GreetingTime(raw.to_string());
    let (hour, minute) = raw.trim().split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok(GreetingSchedule {
        hour,
        minute,
        ..GreetingSchedule::default()
    })
}

impl AssistantConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("BOT_TOKEN").ok_or(ConfigError::MissingToken)?;

        let admin_chat_id = match get("ADMIN_CHAT_ID") {
            Some(raw) => Some(ChatId(
                raw.trim()
                    .parse::<i64>()
                    .map_err(|_| ConfigError::ChatId(raw.clone()))?,
            )),
            None => None,
        };

        let greeting = match get("GREETING_TIME") {
            Some(raw) => parse_greeting_time(&raw)?,
            None => GreetingSchedule::default(),
        };

        Ok(Self {
            bot_token,
            admin_chat_id,
            greeting,
            weather: WeatherConfig::from_lookup(&lookup),
            proxy: proxy_from_lookup(&lookup),
        })
    }
}
