//! Best-effort alert fan-out.
//!
//! Every configured channel gets every alert; channels are attempted
//! concurrently and a failing channel is logged and otherwise ignored.

pub mod email;
pub mod telegram;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::alerts::email::EmailChannel;
use crate::alerts::telegram::TelegramChannel;
use crate::config::service::AlertsConfig;
use crate::observability::metrics::get_metrics;

#[derive(Debug, Clone)]
pub struct AlertMessage {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl AlertMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A delivery path for alerts (chat bot, email).
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, message: &AlertMessage) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct AlertDispatcher {
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl AlertDispatcher {
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    /// Build the channels whose configuration is complete; the rest are skipped.
    pub fn from_config(config: &AlertsConfig, client: &Client) -> Self {
        let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();

        match config.telegram.as_ref().and_then(|cfg| TelegramChannel::from_config(cfg, client)) {
            Some(channel) => channels.push(Arc::new(channel)),
            None => info!("alerts: telegram channel not configured, skipped"),
        }
        match config.email.as_ref() {
            Some(cfg) => match EmailChannel::from_config(cfg, client) {
                Some(channel) => channels.push(Arc::new(channel)),
                None => warn!("alerts: email channel missing {}, skipped", cfg.missing_fields().join("/")),
            },
            None => info!("alerts: email channel not configured, skipped"),
        }

        Self::new(channels)
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Deliver `text` to every channel. Never fails.
    pub async fn send_alert(&self, text: &str) {
        let message = AlertMessage::new(text);
        warn!("sending alert: {}", message.text);

        if self.channels.is_empty() {
            warn!("alerts: no channel configured, alert only logged");
            return;
        }

        let metrics = get_metrics().await;
        let mut join_set = JoinSet::new();
        for channel in &self.channels {
            let channel = channel.clone();
            let message = message.clone();
            join_set.spawn(async move {
                let outcome = channel.deliver(&message).await;
                (channel.name(), outcome)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((name, Ok(()))) => {
                    info!("alerts: {} alert sent", name);
                    metrics.alert_deliveries.with_label_values(&[name, "sent"]).inc();
                }
                Ok((name, Err(err))) => {
                    error!("alerts: {} send failed: {:#}", name, err);
                    metrics.alert_deliveries.with_label_values(&[name, "failed"]).inc();
                }
                Err(err) => {
                    error!("alerts: channel task aborted: {}", err);
                    metrics.alert_deliveries.with_label_values(&["unknown", "failed"]).inc();
                }
            }
        }
    }
}
