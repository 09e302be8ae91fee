use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::alerts::{AlertMessage, NotificationChannel};
use crate::config::service::TelegramConfig;
use crate::utils::constants::TELEGRAM_ALERT_PREFIX;

/// Telegram Bot API `sendMessage` to a single chat.
pub struct TelegramChannel {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(client: Client, api_base: &str, bot_token: &str, chat_id: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_owned(),
            bot_token: bot_token.to_owned(),
            chat_id: chat_id.to_owned(),
        }
    }

    /// `None` unless both bot token and chat id are set.
    pub fn from_config(config: &TelegramConfig, client: &Client) -> Option<Self> {
        let (bot_token, chat_id) = config.credentials()?;
        Some(Self::new(client.clone(), &config.api_base, bot_token, chat_id))
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn deliver(&self, message: &AlertMessage) -> Result<()> {
        let body = json!({
            "chat_id": self.chat_id,
            "text": format!("{}\n{}", TELEGRAM_ALERT_PREFIX, message.text),
        });

        let response = self
            .client
            .post(self.send_message_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("telegram sendMessage failed: {}", e.without_url()))?;
        if !response.status().is_success() {
            // the bot token is part of the url, keep it out of the error
            return Err(anyhow!("telegram sendMessage failed: {}", response.status()));
        }
        Ok(())
    }
}
