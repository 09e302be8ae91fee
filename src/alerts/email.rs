use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::alerts::{AlertMessage, NotificationChannel};
use crate::config::service::{non_empty, EmailConfig};
use crate::utils::constants::EMAIL_ALERT_SUBJECT;

/// Mail delivery through an HTTP mail-sending API authenticated with the
/// sender's credentials (basic auth).
pub struct EmailChannel {
    client: Client,
    api_url: String,
    username: String,
    password: String,
    from: String,
    to: String,
}

#[derive(Debug, Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl EmailChannel {
    /// `None` unless url, credentials and recipient are all set.
    pub fn from_config(config: &EmailConfig, client: &Client) -> Option<Self> {
        if !config.is_complete() {
            return None;
        }
        Some(Self {
            client: client.clone(),
            api_url: non_empty(&config.api_url)?.to_owned(),
            username: non_empty(&config.username)?.to_owned(),
            password: non_empty(&config.password)?.to_owned(),
            from: config.sender()?.to_owned(),
            to: non_empty(&config.to)?.to_owned(),
        })
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn deliver(&self, message: &AlertMessage) -> Result<()> {
        let mail = OutgoingMail {
            from: &self.from,
            to: &self.to,
            subject: EMAIL_ALERT_SUBJECT,
            text: &message.text,
        };

        let response = self
            .client
            .post(&self.api_url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&mail)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("mail api answered {}: {}", status, body));
        }
        Ok(())
    }
}
