use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

use crate::config::settings::SettingsConfig;
use crate::gateway::cj::CjApi;
use crate::observability::metrics::get_metrics;
use crate::observability::routes::MetricsState;
use crate::server::routes;
use crate::sources::refresher::CredentialRefresher;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub cj: Arc<CjApi>,
    pub refresher: Arc<CredentialRefresher>,
}

impl AppState {
    pub async fn new(cj: Arc<CjApi>, refresher: Arc<CredentialRefresher>) -> Self {
        let metrics = get_metrics().await;
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            cj,
            refresher,
        }
    }
}

pub fn router(settings_config: &SettingsConfig, state: AppState) -> Router {
    Router::new()
        .merge(state.metrics_state.router(&settings_config.metrics))
        .merge(routes::router())
        .with_state(state)
}

/// Serve the API until SIGINT/SIGTERM.
pub async fn start(settings_config: &SettingsConfig, state: AppState) -> Result<()> {
    let metrics = get_metrics().await;
    let app = router(settings_config, state);

    let bind_addr = format!("{}:{}", settings_config.server.host, settings_config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("listening on {}", bind_addr);
    metrics.up.set(1);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    metrics.up.set(0);
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let (mut sigint, mut sigterm) = match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
        (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
        _ => {
            tracing::error!("cannot install signal handlers, running until killed");
            return std::future::pending().await;
        }
    };
    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT (Ctrl+C). Initiating graceful shutdown..."),
        _ = sigterm.recv() => info!("Received SIGTERM. Initiating graceful shutdown..."),
    }
}
