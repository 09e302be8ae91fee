use serde::Deserialize;

use crate::config::settings::SettingsConfig;
use crate::utils::constants::{
    DEFAULT_AUTH_EXPIRED_CODE, DEFAULT_CJ_BASE_URL, DEFAULT_REFRESH_PATH, DEFAULT_TELEGRAM_API_BASE,
    DEFAULT_TOKEN_CACHE_PATH, DEFAULT_TOKEN_HEADER,
};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub settings: SettingsConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub token_cache: TokenCacheConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
}

/// ================================
/// Upstream (CJ Dropshipping) API
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    pub app_key: String,
    pub app_secret: String,
    /// seeds the token store when no cache file exists yet
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_header")]
    pub token_header: String,
    #[serde(default = "default_auth_expired_code")]
    pub auth_expired_code: i64,
}

impl UpstreamConfig {
    pub fn refresh_url(&self) -> String {
        join_url(&self.base_url, &self.refresh_path)
    }

    pub fn seed_access_token(&self) -> Option<&str> {
        non_empty(&self.access_token)
    }

    pub fn seed_refresh_token(&self) -> Option<&str> {
        non_empty(&self.refresh_token)
    }
}

/// ================================
/// Persisted token cache
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct TokenCacheConfig {
    #[serde(default = "default_token_cache_path")]
    pub path: String,
}

impl Default for TokenCacheConfig {
    fn default() -> Self {
        Self {
            path: default_token_cache_path(),
        }
    }
}

/// ================================
/// Alert channels
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AlertsConfig {
    pub telegram: Option<TelegramConfig>,
    pub email: Option<EmailConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
}

impl TelegramConfig {
    /// `(bot_token, chat_id)` when both are set to something non-empty
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((non_empty(&self.bot_token)?, non_empty(&self.chat_id)?))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// sender address, defaults to `username`
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

impl EmailConfig {
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Required fields that are unset or empty, in config order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("api_url", &self.api_url),
            ("username", &self.username),
            ("password", &self.password),
            ("to", &self.to),
        ]
        .into_iter()
        .filter(|(_, value)| non_empty(value).is_none())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn sender(&self) -> Option<&str> {
        non_empty(&self.from).or_else(|| non_empty(&self.username))
    }
}

/// env expansion turns unset variables into "", which counts as not configured
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn default_base_url() -> String {
    DEFAULT_CJ_BASE_URL.to_string()
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_token_header() -> String {
    DEFAULT_TOKEN_HEADER.to_string()
}

fn default_auth_expired_code() -> i64 {
    DEFAULT_AUTH_EXPIRED_CODE
}

fn default_token_cache_path() -> String {
    DEFAULT_TOKEN_CACHE_PATH.to_string()
}

fn default_telegram_api_base() -> String {
    DEFAULT_TELEGRAM_API_BASE.to_string()
}
