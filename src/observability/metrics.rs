use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Refresh metrics
    pub refresh_attempts: IntCounter,
    pub refresh_failures: IntCounterVec,
    pub refresh_joined: IntCounter,
    pub refresh_duration: HistogramVec,

    // Token store metrics
    pub store_updated_unix: IntGauge,
    pub store_persist_failures: IntCounter,

    // Alert metrics
    pub alert_deliveries: IntCounterVec,

    // Gateway metrics
    pub gateway_requests: IntCounterVec,
    pub gateway_retries: IntCounter,

    // Config/runtime
    pub config_parse_failures: IntCounter,
    pub config_validation_errors: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("cjtokenagent".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Refresh
            refresh_attempts: IntCounter::new("refresh_attempts_total", "Upstream token exchanges issued").unwrap(),
            refresh_failures: IntCounterVec::new(Opts::new("refresh_failures_total", "Failed token exchanges by reason"), &["reason"]).unwrap(),
            refresh_joined: IntCounter::new("refresh_joined_total", "Refresh calls that joined an in-flight exchange").unwrap(),
            refresh_duration: HistogramVec::new(HistogramOpts::new("refresh_duration_seconds", "Token exchange duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), &["outcome"]).unwrap(),

            // Store
            store_updated_unix: IntGauge::new("token_store_updated_unix_seconds", "Last successful token store update").unwrap(),
            store_persist_failures: IntCounter::new("token_store_persist_failures_total", "Token cache file write failures").unwrap(),

            // Alerts
            alert_deliveries: IntCounterVec::new(Opts::new("alert_deliveries_total", "Alert deliveries by channel and outcome"), &["channel", "outcome"]).unwrap(),

            // Gateway
            gateway_requests: IntCounterVec::new(Opts::new("gateway_requests_total", "Protected upstream calls by outcome"), &["outcome"]).unwrap(),
            gateway_retries: IntCounter::new("gateway_retries_total", "Protected calls re-issued after a refresh").unwrap(),

            // Config/runtime
            config_parse_failures: IntCounter::new("config_parse_failures_total", "Config file parse failures").unwrap(),
            config_validation_errors: IntCounter::new("config_validation_errors_total", "Validation errors during startup").unwrap(),
            up: IntGauge::new("up", "1 if service is healthy").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.refresh_attempts.clone())).unwrap();
        reg.register(Box::new(metrics.refresh_failures.clone())).unwrap();
        reg.register(Box::new(metrics.refresh_joined.clone())).unwrap();
        reg.register(Box::new(metrics.refresh_duration.clone())).unwrap();
        reg.register(Box::new(metrics.store_updated_unix.clone())).unwrap();
        reg.register(Box::new(metrics.store_persist_failures.clone())).unwrap();
        reg.register(Box::new(metrics.alert_deliveries.clone())).unwrap();
        reg.register(Box::new(metrics.gateway_requests.clone())).unwrap();
        reg.register(Box::new(metrics.gateway_retries.clone())).unwrap();
        reg.register(Box::new(metrics.config_parse_failures.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
