//! CJ token-exchange call
//!
//! `POST {base_url}{refresh_path}` with `{appKey, appSecret, refreshToken}`.
//! Success is signalled by the body `code`, not by the HTTP status.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::service::UpstreamConfig;
use crate::errors::RefreshFailed;
use crate::utils::constants::CJ_SUCCESS_CODE;

const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRequest<'a> {
    app_key: &'a str,
    app_secret: &'a str,
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<TokenPair>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct TokenExchange {
    client: Client,
    url: String,
    app_key: String,
    app_secret: String,
}

impl TokenExchange {
    pub fn new(client: Client, upstream: &UpstreamConfig) -> Self {
        Self {
            client,
            url: upstream.refresh_url(),
            app_key: upstream.app_key.to_owned(),
            app_secret: upstream.app_secret.to_owned(),
        }
    }

    /// Single attempt; no retry.
    pub async fn exchange(&self, refresh_token: &str) -> Result<TokenPair, RefreshFailed> {
        let request = ExchangeRequest {
            app_key: &self.app_key,
            app_secret: &self.app_secret,
            refresh_token,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|err| RefreshFailed::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| RefreshFailed::Transport(err.to_string()))?;
        debug!("token exchange answered {}", status);

        let parsed: ExchangeResponse = serde_json::from_str(&body).map_err(|err| {
            RefreshFailed::Transport(format!("malformed token exchange response ({}): {}", status, err))
        })?;

        interpret(parsed)
    }
}

fn interpret(response: ExchangeResponse) -> Result<TokenPair, RefreshFailed> {
    if response.code != CJ_SUCCESS_CODE {
        let message = response
            .msg
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_ERROR.to_owned());
        return Err(RefreshFailed::Rejected {
            code: Some(response.code),
            message,
        });
    }

    match response.data {
        Some(pair) if !pair.access_token.is_empty() && !pair.refresh_token.is_empty() => Ok(pair),
        _ => Err(RefreshFailed::Transport(
            "malformed token exchange response: accessToken/refreshToken missing".to_owned(),
        )),
    }
}
