use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::alerts::AlertDispatcher;
use crate::cache::credential::Credential;
use crate::cache::token_store::TokenStore;
use crate::errors::RefreshFailed;
use crate::observability::metrics::get_metrics;
use crate::sources::exchange::TokenExchange;

pub type RefreshOutcome = Result<Credential, RefreshFailed>;

type FlightSlot = Mutex<Option<watch::Receiver<Option<RefreshOutcome>>>>;

/// Mints a new CJ credential through the token exchange.
///
/// Concurrent `refresh` calls share one upstream exchange. The exchange runs on
/// its own task, so it completes (store write, alert) even when every caller
/// has gone away. Failures are alerted once per exchange and handed back as
/// [`RefreshFailed`]; the store is only written on success.
pub struct CredentialRefresher {
    flight: Arc<Flight>,
    in_flight: Arc<FlightSlot>,
}

/// Everything one exchange needs, shared with the spawned flight task.
struct Flight {
    store: Arc<dyn TokenStore>,
    exchange: TokenExchange,
    alerts: AlertDispatcher,
    seed_refresh_token: Option<String>,
}

/// Frees the flight slot when the flight task ends, including on panic.
struct FlightGuard {
    slot: Arc<FlightSlot>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        lock_slot(&self.slot).take();
    }
}

fn lock_slot(slot: &FlightSlot) -> MutexGuard<'_, Option<watch::Receiver<Option<RefreshOutcome>>>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl CredentialRefresher {
    pub fn new(
        store: Arc<dyn TokenStore>,
        exchange: TokenExchange,
        alerts: AlertDispatcher,
        seed_refresh_token: Option<&str>,
    ) -> Self {
        Self {
            flight: Arc::new(Flight {
                store,
                exchange,
                alerts,
                seed_refresh_token: seed_refresh_token.map(str::to_owned),
            }),
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Unconditional refresh, joining an exchange already in flight.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.join_or_start(None).await
    }

    /// Refresh because `stale` was rejected upstream.
    ///
    /// When the store already holds a different access token, another caller
    /// refreshed in the meantime and that credential is returned without a new
    /// exchange.
    pub async fn refresh_if_current(&self, stale: &str) -> RefreshOutcome {
        if let Some(current) = self.flight.already_refreshed(stale).await {
            debug!("access token already refreshed, skipping exchange");
            return Ok(current);
        }
        self.join_or_start(Some(stale.to_owned())).await
    }

    async fn join_or_start(&self, stale: Option<String>) -> RefreshOutcome {
        let (mut rx, joined) = {
            let mut slot = lock_slot(&self.in_flight);
            match slot.as_ref() {
                Some(rx) => (rx.clone(), true),
                None => {
                    let (tx, rx) = watch::channel(None);
                    *slot = Some(rx.clone());
                    self.spawn_flight(tx, stale);
                    (rx, false)
                }
            }
        };

        if joined {
            get_metrics().await.refresh_joined.inc();
            info!("token refresh already in flight, waiting for its outcome");
        }

        let result = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or(Err(RefreshFailed::Abandoned)),
            // the flight task died without publishing (panic or runtime shutdown)
            Err(_) => Err(RefreshFailed::Abandoned),
        };
        result
    }

    fn spawn_flight(&self, tx: watch::Sender<Option<RefreshOutcome>>, stale: Option<String>) {
        let flight = self.flight.clone();
        let guard = FlightGuard { slot: self.in_flight.clone() };
        tokio::spawn(async move {
            let _guard = guard;
            let outcome = flight.run(stale.as_deref()).await;
            // no receiver left is fine, every caller went away
            let _ = tx.send(Some(outcome));
        });
    }
}

impl Flight {
    async fn already_refreshed(&self, stale: &str) -> Option<Credential> {
        self.store
            .get()
            .await
            .filter(|current| !current.access_token.is_empty() && current.access_token != stale)
    }

    async fn run(&self, stale: Option<&str>) -> RefreshOutcome {
        // a flight that finished just before this one started may already have replaced `stale`
        if let Some(stale) = stale {
            if let Some(current) = self.already_refreshed(stale).await {
                debug!("access token already refreshed, skipping exchange");
                return Ok(current);
            }
        }

        let metrics = get_metrics().await;
        let start = Instant::now();
        metrics.refresh_attempts.inc();

        let refresh_token = self.current_refresh_token().await;
        info!("refreshing CJ access token");

        match self.exchange.exchange(&refresh_token).await {
            Ok(pair) => {
                let stored = self
                    .store
                    .put(Credential::new(pair.access_token, pair.refresh_token))
                    .await;
                metrics
                    .refresh_duration
                    .with_label_values(&["success"])
                    .observe(start.elapsed().as_secs_f64());
                info!("CJ access token refreshed successfully, updated at {}", stored.updated_at);
                Ok(stored)
            }
            Err(failure) => {
                metrics
                    .refresh_duration
                    .with_label_values(&["failure"])
                    .observe(start.elapsed().as_secs_f64());
                metrics.refresh_failures.with_label_values(&[failure.reason()]).inc();
                error!("CJ token refresh failed: {}", failure);
                self.alerts.send_alert(&failure.to_string()).await;
                Err(failure)
            }
        }
    }

    /// Refresh token from the store, the configured one until the first refresh.
    async fn current_refresh_token(&self) -> String {
        self.store
            .get()
            .await
            .map(|credential| credential.refresh_token)
            .filter(|token| !token.is_empty())
            .or_else(|| self.seed_refresh_token.clone())
            .unwrap_or_default()
    }
}
