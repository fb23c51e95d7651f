//! Current weather lookup (OpenWeatherMap).

use crate::config::WeatherConfig;
use crate::http::{build_client, REQUEST_TIMEOUT};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error};

pub const OPENWEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("WEATHER_API_KEY is not set")]
    MissingApiKey,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("weather API returned {0}")]
    Status(u16),
    #[error("unexpected weather payload: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for WeatherError {
    fn from(err: serde_json::Error) -> Self {
        WeatherError::Parse(err.to_string())
    }
}

/// Weather description and temperature in °C.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub city: String,
    pub description: String,
    pub temperature: f64,
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Current weather in {}: {}, temperature: {}°C",
            self.city, self.description, self.temperature
        )
    }
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    weather: Vec<OwmCondition>,
    main: OwmMain,
}

/// Parse an OpenWeatherMap current-weather body.
pub fn parse_weather(city: &str, body: &str) -> Result<WeatherReport, WeatherError> {
    let resp: OwmResponse = serde_json::from_str(body)?;
    let description = resp
        .weather
        .into_iter()
        .next()
        .map(|c| c.description)
        .ok_or_else(|| WeatherError::Parse("empty weather list".to_string()))?;
    Ok(WeatherReport {
        city: city.to_string(),
        description,
        temperature: resp.main.temp,
    })
}

pub struct WeatherClient {
    config: WeatherConfig,
    http_client: reqwest::Client,
    endpoint: String,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> Result<Self, WeatherError> {
        let http_client = build_client(config.proxy.as_deref(), REQUEST_TIMEOUT)?;
        Ok(Self {
            config,
            http_client,
            endpoint: OPENWEATHER_URL.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn city(&self) -> &str {
        &self.config.city
    }

    pub async fn fetch(&self) -> Result<WeatherReport, WeatherError> {
        let api_key = self.config.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[
                ("q", self.config.city.as_str()),
                ("appid", api_key),
                ("units", "metric"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!("weather API body: {}", response.text().await.unwrap_or_default());
            return Err(WeatherError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_weather(&self.config.city, &body)
    }

    /// Like [`fetch`](Self::fetch), logging the error and yielding `None`.
    pub async fn current(&self) -> Option<WeatherReport> {
        match self.fetch().await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Weather lookup for {} failed: {}", self.config.city, e);
                None
            }
        }
    }
}
