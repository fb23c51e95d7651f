//! Assistant bot: commands plus the daily greeting.

use crate::telegram::{build_bot, TelegramError};
use crate::weather::{WeatherClient, WeatherReport};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use spread_core::{format_shanghai, shanghai};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

/// Bot commands.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot and get your chat id")]
    Start,
    #[command(description = "Show help")]
    Help,
    #[command(description = "Get the current weather")]
    Weather,
}

/// Time of day for the greeting, in a fixed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GreetingSchedule {
    pub hour: u32,
    pub minute: u32,
    pub offset: FixedOffset,
}

impl Default for GreetingSchedule {
    fn default() -> Self {
        Self {
            hour: 8,
            minute: 0,
            offset: shanghai(),
        }
    }
}

impl GreetingSchedule {
    /// Next occurrence strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = now.with_timezone(&self.offset);
        let at = local.date_naive().and_hms_opt(self.hour, self.minute, 0)?;
        let mut next = at.and_local_timezone(self.offset).single()?.with_timezone(&Utc);
        if next <= now {
            next += Duration::days(1);
        }
        Some(next)
    }
}

pub fn start_text(chat_id: ChatId) -> String {
    format!(
        "Hello! Welcome to your personal assistant.\n\n\
         Your chat id is: <code>{}</code>\n\n\
         Put it into <code>ADMIN_CHAT_ID</code> in your <code>.env</code> file and \
         restart the bot to enable the daily greeting.\n\n\
         Use /weather for the current weather.\n\
         Use /help for help.",
        chat_id
    )
}

pub fn weather_text(city: &str, report: Option<&WeatherReport>) -> String {
    match report {
        Some(report) => report.to_string(),
        None => format!("Sorry, fetching the weather for {} failed. Please try again later.", city),
    }
}

pub fn greeting_text(report: Option<&WeatherReport>) -> String {
    match report {
        Some(report) => format!("Good morning! {}. Have a great day!", report),
        None => "Good morning! Fetching the weather failed today, but have a great day anyway!".to_string(),
    }
}

/// Command handler plus greeting job sharing one bot and weather client.
pub struct AssistantBot {
    bot: Bot,
    weather: Arc<WeatherClient>,
    admin_chat_id: Option<ChatId>,
    schedule: GreetingSchedule,
}

impl AssistantBot {
    /// Bot API calls go through `proxy` when set, on teloxide's default
    /// timeouts (long polling outlives the alert timeout).
    pub fn new(
        token: &str,
        proxy: Option<&str>,
        weather: WeatherClient,
        admin_chat_id: Option<ChatId>,
    ) -> Result<Self, TelegramError> {
        Ok(Self {
            bot: build_bot(token, proxy, None)?,
            weather: Arc::new(weather),
            admin_chat_id,
            schedule: GreetingSchedule::default(),
        })
    }

    /// Point the bot at another Bot API host.
    pub fn with_api_url(mut self, url: teloxide_reqwest::Url) -> Self {
        self.bot = self.bot.set_api_url(url);
        self
    }

    pub fn with_schedule(mut self, schedule: GreetingSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Start the greeting job and run the command dispatcher until Ctrl+C.
    pub async fn run(self: Arc<Self>) {
        let greeter = Arc::clone(&self);
        let greeting_task = tokio::spawn(async move { greeter.run_greetings().await });

        let bot = self.bot.clone();
        let handler = Update::filter_message().filter_command::<Command>().endpoint(
            move |bot: Bot, msg: Message, cmd: Command| {
                let this = Arc::clone(&self);
                async move { this.handle_command(bot, msg, cmd).await }
            },
        );

        Dispatcher::builder(bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        greeting_task.abort();
    }

    async fn handle_command(&self, bot: Bot, msg: Message, cmd: Command) -> Result<(), TelegramError> {
        let chat_id = msg.chat.id;
        info!("chat {} ran {:?}", chat_id, cmd);

        match cmd {
            Command::Start => {
                bot.send_message(chat_id, start_text(chat_id))
                    .parse_mode(ParseMode::Html)
                    .await?;
            }
            Command::Help => {
                bot.send_message(chat_id, Command::descriptions().to_string())
                    .await?;
            }
            Command::Weather => {
                let city = self.weather.city();
                let pending = bot
                    .send_message(chat_id, format!("Fetching the weather for {}...", city))
                    .await?;
                let report = self.weather.current().await;
                if report.is_none() {
                    warn!("weather for chat {} unavailable", chat_id);
                }
                bot.edit_message_text(chat_id, pending.id, weather_text(city, report.as_ref()))
                    .await?;
            }
        }

        Ok(())
    }

    async fn run_greetings(&self) {
        loop {
            let now = Utc::now();
            let Some(next) = self.schedule.next_after(now) else {
                error!("invalid greeting time {:02}:{:02}", self.schedule.hour, self.schedule.minute);
                return;
            };
            info!("next greeting at {} (UTC+8)", format_shanghai(next));

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            self.send_greeting().await;
        }
    }

    async fn send_greeting(&self) {
        let Some(chat_id) = self.admin_chat_id else {
            warn!("ADMIN_CHAT_ID is not set, skipping the morning greeting");
            return;
        };

        let report = self.weather.current().await;
        if report.is_none() {
            warn!("weather unavailable, sending fallback greeting");
        }

        match self.bot.send_message(chat_id, greeting_text(report.as_ref())).await {
            Ok(_) => info!("morning greeting sent to {}", chat_id),
            Err(e) => error!("morning greeting to {} failed: {}", chat_id, e),
        }
    }
}
