//! Protected CJ API calls.
//!
//! Every call carries the current access token. An auth-expired answer
//! triggers one refresh and, if it succeeds, exactly one re-issue of the same
//! request; otherwise the original answer goes back to the caller. A token
//! that was already replaced by another caller's refresh is not refreshed again.

pub mod cj;

use std::sync::Arc;

use http::{Method, StatusCode};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::token_store::TokenStore;
use crate::config::service::UpstreamConfig;
use crate::errors::GatewayError;
use crate::observability::metrics::get_metrics;
use crate::sources::refresher::CredentialRefresher;
use crate::utils::constants::CJ_SUCCESS_CODE;

/// A replayable upstream request, relative to the upstream base url.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl GatewayRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub body: String,
}

impl GatewayResponse {
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// CJ business code carried in the body, if any.
    pub fn code(&self) -> Option<i64> {
        self.json()?.get("code")?.as_i64()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success() && self.code().map_or(true, |code| code == CJ_SUCCESS_CODE)
    }
}

pub struct ApiGateway {
    client: Client,
    base_url: String,
    token_header: String,
    auth_expired_code: i64,
    store: Arc<dyn TokenStore>,
    refresher: Arc<CredentialRefresher>,
}

impl ApiGateway {
    pub fn new(
        client: Client,
        upstream: &UpstreamConfig,
        store: Arc<dyn TokenStore>,
        refresher: Arc<CredentialRefresher>,
    ) -> Self {
        Self {
            client,
            base_url: upstream.base_url.trim_end_matches('/').to_owned(),
            token_header: upstream.token_header.to_owned(),
            auth_expired_code: upstream.auth_expired_code,
            store,
            refresher,
        }
    }

    pub async fn call(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let metrics = get_metrics().await;
        let access_token = self
            .store
            .get()
            .await
            .map(|credential| credential.access_token)
            .unwrap_or_default();

        let first = self.send(request, &access_token).await.inspect_err(|_| {
            metrics.gateway_requests.with_label_values(&["transport_error"]).inc();
        })?;

        if !self.is_auth_expired(&first) {
            metrics.gateway_requests.with_label_values(&[outcome_label(&first)]).inc();
            return Ok(first);
        }

        info!("{} {}: access token rejected, refreshing", request.method, request.path);
        match self.refresher.refresh_if_current(&access_token).await {
            Ok(credential) => {
                metrics.gateway_retries.inc();
                let retried = self.send(request, &credential.access_token).await.inspect_err(|_| {
                    metrics.gateway_requests.with_label_values(&["transport_error"]).inc();
                })?;
                metrics.gateway_requests.with_label_values(&[outcome_label(&retried)]).inc();
                Ok(retried)
            }
            Err(failure) => {
                warn!("{} {}: refresh failed, giving up: {}", request.method, request.path, failure);
                metrics.gateway_requests.with_label_values(&["auth_expired"]).inc();
                Ok(first)
            }
        }
    }

    /// HTTP 401/403, or a body `code` equal to the configured auth-expired code.
    pub fn is_auth_expired(&self, response: &GatewayResponse) -> bool {
        matches!(response.status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            || response.code() == Some(self.auth_expired_code)
    }

    async fn send(&self, request: &GatewayRequest, access_token: &str) -> Result<GatewayResponse, GatewayError> {
        let url = format!("{}/{}", self.base_url, request.path.trim_start_matches('/'));
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(self.token_header.as_str(), access_token);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("{} {} answered {}", request.method, url, status);

        Ok(GatewayResponse { status, body })
    }
}

fn outcome_label(response: &GatewayResponse) -> &'static str {
    if response.is_success() {
        "success"
    } else {
        "upstream_error"
    }
}
