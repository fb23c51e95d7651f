//! Notification and weather settings resolved from the environment.

/// Proxy variables in lookup order.
pub const PROXY_VARS: &[&str] = &["HTTPS_PROXY", "https_proxy", "HTTP_PROXY", "http_proxy"];

pub const DEFAULT_WEATHER_CITY: &str = "Guangzhou";

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// First proxy URL found in the environment.
pub fn proxy_from_lookup<F>(lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    PROXY_VARS.iter().find_map(|key| non_empty(lookup, key))
}

/// Telegram bot credential and destination chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    /// Optional forward proxy for API calls
    pub proxy: Option<String>,
}

impl TelegramConfig {
    /// Uses BOT_TOKEN and ADMIN_CHAT_ID. `None` when either is missing.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = non_empty(&lookup, "BOT_TOKEN")?;
        let chat_id = non_empty(&lookup, "ADMIN_CHAT_ID")?;
        Some(Self {
            bot_token,
            chat_id,
            proxy: proxy_from_lookup(&lookup),
        })
    }
}

/// OpenWeatherMap settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub city: String,
    pub proxy: Option<String>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            city: DEFAULT_WEATHER_CITY.to_string(),
            proxy: None,
        }
    }
}

impl WeatherConfig {
    /// Uses WEATHER_API_KEY and WEATHER_CITY.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            api_key: non_empty(&lookup, "WEATHER_API_KEY"),
            city: non_empty(&lookup, "WEATHER_CITY").unwrap_or_else(|| DEFAULT_WEATHER_CITY.to_string()),
            proxy: proxy_from_lookup(&lookup),
        }
    }
}
