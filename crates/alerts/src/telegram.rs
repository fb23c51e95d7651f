//! Telegram delivery for divergence alerts.

use crate::config::TelegramConfig;
use crate::http::REQUEST_TIMEOUT;
use async_trait::async_trait;
use spread_engine::Notifier;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{LinkPreviewOptions, ParseMode, Recipient};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("HTTP client error: {0}")]
    Client(#[from] teloxide_reqwest::Error),
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
}

/// Build a teloxide [`Bot`] on teloxide's default client settings, with an
/// optional forward proxy and request timeout.
pub fn build_bot(token: &str, proxy: Option<&str>, timeout: Option<Duration>) -> Result<Bot, TelegramError> {
    let mut builder = teloxide::net::default_reqwest_settings();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(url) = proxy {
        builder = builder.proxy(teloxide_reqwest::Proxy::all(url)?);
    }
    Ok(Bot::with_client(token, builder.build()?))
}

/// Numeric chat ids go out as ids, anything else (`@channel`) as a username.
fn recipient(chat_id: &str) -> Recipient {
    match chat_id.trim().parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(chat_id.trim().to_string()),
    }
}

fn no_link_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

/// Sends HTML messages to one chat through the Bot API.
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: Recipient,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, TelegramError> {
        let bot = build_bot(&config.bot_token, config.proxy.as_deref(), Some(REQUEST_TIMEOUT))?;
        Ok(Self {
            bot,
            chat_id: recipient(&config.chat_id),
        })
    }

    /// Point the notifier at another Bot API host.
    pub fn with_api_url(mut self, url: teloxide_reqwest::Url) -> Self {
        self.bot = self.bot.set_api_url(url);
        self
    }

    pub fn chat_id(&self) -> &Recipient {
        &self.chat_id
    }

    /// Send a message. Transport errors, timeouts and API errors (any
    /// non-2xx answer) are returned.
    pub async fn send_message(&self, message: &str) -> Result<(), TelegramError> {
        self.bot
            .send_message(self.chat_id.clone(), message)
            .parse_mode(ParseMode::Html)
            .link_preview_options(no_link_preview())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> bool {
        match self.send_message(text).await {
            Ok(()) => true,
            Err(e) => {
                error!("Telegram message failed: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

/// Writes alerts to the log instead of a chat.
///
/// Used when no credential is configured (reports failure, like a send
/// that never reached the channel) or in dry-run mode (reports success so
/// cooldowns still throttle the output).
#[derive(Debug, Clone, Copy)]
pub struct LogOnlyNotifier {
    report_success: bool,
}

impl LogOnlyNotifier {
    /// Credential missing: every send is a failed delivery.
    pub fn unconfigured() -> Self {
        Self {
            report_success: false,
        }
    }

    pub fn dry_run() -> Self {
        Self {
            report_success: true,
        }
    }
}

#[async_trait]
impl Notifier for LogOnlyNotifier {
    async fn send(&self, text: &str) -> bool {
        if self.report_success {
            info!("[dry-run] alert:\n{}", text);
        } else {
            warn!("Telegram not configured (BOT_TOKEN / ADMIN_CHAT_ID), alert logged only:\n{}", text);
        }
        self.report_success
    }

    fn name(&self) -> &'static str {
        if self.report_success {
            "dry-run log"
        } else {
            "log (unconfigured)"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SENT: &str = r#"{"ok":true,"result":{"message_id":7,"from":{"id":123,"is_bot":true,"first_name":"Monitor"},"chat":{"id":42,"first_name":"Ops","type":"private"},"date":1700000000,"text":"hi"}}"#;

    fn config() -> TelegramConfig {
        TelegramConfig {
            bot_token: "123:abc".to_string(),
            chat_id: "42".to_string(),
            proxy: None,
        }
    }

    fn notifier(server: &MockServer) -> TelegramNotifier {
        TelegramNotifier::new(config())
            .unwrap()
            .with_api_url(server.uri().parse().unwrap())
    }

    #[tokio::test]
    async fn test_send_success_on_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(serde_json::json!({
                "chat_id": 42,
                "text": "<b>hi</b>",
                "parse_mode": "HTML",
                "link_preview_options": {"is_disabled": true},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(SENT))
            .expect(1)
            .mount(&server)
            .await;

        assert!(notifier(&server).send("<b>hi</b>").await);
    }

    #[tokio::test]
    async fn test_send_failure_on_bad_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
            ))
            .mount(&server)
            .await;

        let notifier = notifier(&server);
        match notifier.send_message("x").await {
            Err(TelegramError::Api(teloxide::RequestError::Api(api))) => {
                assert_eq!(api, teloxide::ApiError::ChatNotFound);
            }
            other => panic!("Expected API error, got {:?}", other),
        }
        assert!(!notifier.send("x").await);
    }

    #[tokio::test]
    async fn test_send_failure_on_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string(
                r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#,
            ))
            .mount(&server)
            .await;

        assert!(!notifier(&server).send("x").await);
    }

    #[tokio::test]
    async fn test_send_failure_on_transport_error() {
        let notifier = TelegramNotifier::new(config())
            .unwrap()
            .with_api_url("http://127.0.0.1:1".parse().unwrap());
        assert!(!notifier.send("x").await);
    }

    #[test]
    fn test_recipient_parsing() {
        assert_eq!(recipient("-1001234"), Recipient::Id(ChatId(-1001234)));
        assert_eq!(
            recipient("@alerts"),
            Recipient::ChannelUsername("@alerts".to_string())
        );
    }

    #[test]
    fn test_build_bot_with_proxy() {
        assert!(build_bot("123:abc", Some("http://127.0.0.1:8080"), Some(REQUEST_TIMEOUT)).is_ok());
        assert!(build_bot("123:abc", None, None).is_ok());
    }

    #[tokio::test]
    async fn test_log_only_notifier() {
        assert!(!LogOnlyNotifier::unconfigured().send("x").await);
        assert!(LogOnlyNotifier::dry_run().send("x").await);
    }
}
