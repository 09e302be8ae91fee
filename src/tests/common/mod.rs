// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::alerts::{AlertDispatcher, AlertMessage, NotificationChannel};
use crate::cache::token_store::TokenStore;
use crate::config::service::UpstreamConfig;
use crate::sources::exchange::TokenExchange;
use crate::sources::refresher::CredentialRefresher;
use crate::utils::constants::{DEFAULT_AUTH_EXPIRED_CODE, DEFAULT_REFRESH_PATH, DEFAULT_TOKEN_HEADER};

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// A port nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn upstream_config(base_url: &str) -> UpstreamConfig {
    UpstreamConfig {
        base_url: base_url.to_owned(),
        refresh_path: DEFAULT_REFRESH_PATH.to_owned(),
        app_key: "app-key".to_owned(),
        app_secret: "app-secret".to_owned(),
        access_token: None,
        refresh_token: Some("RT0".to_owned()),
        token_header: DEFAULT_TOKEN_HEADER.to_owned(),
        auth_expired_code: DEFAULT_AUTH_EXPIRED_CODE,
    }
}

pub fn build_refresher(
    store: Arc<dyn TokenStore>,
    upstream: &UpstreamConfig,
    alerts: AlertDispatcher,
) -> Arc<CredentialRefresher> {
    Arc::new(CredentialRefresher::new(
        store,
        TokenExchange::new(build_reqwest_client(), upstream),
        alerts,
        upstream.seed_refresh_token(),
    ))
}

/// In-process channel recording every delivery attempt.
pub struct RecordingChannel {
    name: &'static str,
    fail: bool,
    attempts: AtomicUsize,
    messages: Mutex<Vec<String>>,
}

impl RecordingChannel {
    pub fn ok(name: &'static str) -> Arc<Self> {
        Arc::new(Self { name, fail: false, attempts: AtomicUsize::new(0), messages: Mutex::new(Vec::new()) })
    }

    pub fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self { name, fail: true, attempts: AtomicUsize::new(0), messages: Mutex::new(Vec::new()) })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn deliver(&self, message: &AlertMessage) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.messages.lock().unwrap().push(message.text.clone());
        if self.fail {
            return Err(anyhow!("{} is down", self.name));
        }
        Ok(())
    }
}

pub fn dispatcher_of(channels: &[Arc<RecordingChannel>]) -> AlertDispatcher {
    AlertDispatcher::new(
        channels
            .iter()
            .map(|c| c.clone() as Arc<dyn NotificationChannel>)
            .collect(),
    )
}
