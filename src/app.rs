//! Wiring of the credential lifecycle components from a loaded config.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tracing::info;

use crate::alerts::AlertDispatcher;
use crate::cache::credential::Credential;
use crate::cache::token_store::{FileTokenStore, TokenStore};
use crate::config::service::ServiceConfig;
use crate::gateway::cj::CjApi;
use crate::gateway::ApiGateway;
use crate::server::server::AppState;
use crate::sources::exchange::TokenExchange;
use crate::sources::refresher::CredentialRefresher;

pub struct App {
    pub store: Arc<dyn TokenStore>,
    pub refresher: Arc<CredentialRefresher>,
    pub cj: Arc<CjApi>,
}

impl App {
    pub async fn build(service_config: &ServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(service_config.settings.http_timeout_ms()))
            .build()?;

        let upstream = &service_config.upstream;
        let seed = Credential::seed(upstream.seed_access_token(), upstream.seed_refresh_token());
        let store: Arc<dyn TokenStore> =
            Arc::new(FileTokenStore::load(&service_config.token_cache.path, seed).await);

        let alerts = AlertDispatcher::from_config(&service_config.alerts, &client);
        info!("alert channels: {:?}", alerts.channel_names());

        let refresher = Arc::new(CredentialRefresher::new(
            store.clone(),
            TokenExchange::new(client.clone(), upstream),
            alerts,
            upstream.seed_refresh_token(),
        ));
        let gateway = ApiGateway::new(client, upstream, store.clone(), refresher.clone());

        Ok(Self {
            store,
            refresher,
            cj: Arc::new(CjApi::new(gateway)),
        })
    }

    pub async fn state(&self) -> AppState {
        AppState::new(self.cj.clone(), self.refresher.clone()).await
    }
}
