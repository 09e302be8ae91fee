//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - upstream credentials and URLs
//! - logging / server / metrics settings
//! - alert channels: a half-configured channel is only a warning, it is skipped at runtime

use tracing::{error, info, warn};

use crate::config::service::{AlertsConfig, ServiceConfig, UpstreamConfig};
use crate::config::settings::SettingsConfig;
use crate::observability::metrics::get_metrics;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_upstream(&cfg.upstream, &mut errors);

    if cfg.token_cache.path.trim().is_empty() {
        errors.push("token_cache.path must not be empty".to_string());
    }

    validate_alerts(&cfg.alerts);

    if errors.is_empty() {
        info!("config is valid");
        Ok(())
    } else {
        let metrics = get_metrics().await;
        for e in &errors {
            error!("config validation: {}", e);
            metrics.config_validation_errors.inc();
        }
        Err(errors)
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if let Some(logging) = &settings.logging {
        let level = logging.level.to_lowercase();
        if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
            errors.push(format!(
                "settings.logging.level '{}' is not one of trace|debug|info|warn|error",
                logging.level
            ));
        }
    }

    if settings.server.host.trim().is_empty() {
        errors.push("settings.server.host must not be empty".to_string());
    }
    if settings.server.port.parse::<u16>().is_err() {
        errors.push(format!(
            "settings.server.port '{}' is not a valid port",
            settings.server.port
        ));
    }

    if settings.metrics.is_enabled && !settings.metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            settings.metrics.path
        ));
    }

    if settings.http_timeout_ms == Some(0) {
        errors.push("settings.http_timeout_ms must be > 0".to_string());
    }
}

fn validate_upstream(upstream: &UpstreamConfig, errors: &mut Vec<String>) {
    if !(upstream.base_url.starts_with("http://") || upstream.base_url.starts_with("https://")) {
        errors.push(format!(
            "upstream.base_url '{}' must start with http:// or https://",
            upstream.base_url
        ));
    }
    if upstream.app_key.trim().is_empty() {
        errors.push("upstream.app_key must not be empty".to_string());
    }
    if upstream.app_secret.trim().is_empty() {
        errors.push("upstream.app_secret must not be empty".to_string());
    }
    if upstream.token_header.trim().is_empty() {
        errors.push("upstream.token_header must not be empty".to_string());
    }
    if upstream.seed_refresh_token().is_none() {
        warn!("upstream.refresh_token is not set, refresh relies on the token cache file");
    }
}

fn validate_alerts(alerts: &AlertsConfig) {
    for warning in alert_warnings(alerts) {
        warn!("{}", warning);
    }
}

/// Alert channel problems that leave a channel disabled. They never fail startup.
pub fn alert_warnings(alerts: &AlertsConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if let Some(telegram) = &alerts.telegram {
        if telegram.credentials().is_none() {
            warnings.push("alerts.telegram is present but bot_token/chat_id are missing, channel disabled".to_string());
        }
    }
    if let Some(email) = &alerts.email {
        let missing = email.missing_fields();
        if missing == ["api_url"] {
            warnings.push(
                "alerts.email has username, password and to but no api_url (ALERT_EMAIL_API_URL), email alerts are disabled"
                    .to_string(),
            );
        } else if !missing.is_empty() {
            warnings.push(format!(
                "alerts.email is missing {}, channel disabled",
                missing.join("/")
            ));
        }
    }
    if alerts.telegram.is_none() && alerts.email.is_none() {
        warnings.push("no alert channel configured, refresh failures will only be logged".to_string());
    }

    warnings
}
