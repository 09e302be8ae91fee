//! Shared constants and invariants

pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_LOG_LEVEL: &str = "info";

// CJ Dropshipping API
pub const DEFAULT_CJ_BASE_URL: &str = "https://developers.cjdropshipping.com/api2.0/v1";
pub const DEFAULT_REFRESH_PATH: &str = "/token/refresh";
pub const DEFAULT_TOKEN_HEADER: &str = "CJ-Access-Token";
/// body `code` the CJ API answers with once the access token is no longer accepted
pub const DEFAULT_AUTH_EXPIRED_CODE: i64 = 403;
pub const CJ_SUCCESS_CODE: i64 = 200;

// token cache
pub const DEFAULT_TOKEN_CACHE_PATH: &str = "./tmp/cj_token_cache.json";

// alerts
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
pub const TELEGRAM_ALERT_PREFIX: &str = "CJ Dropshipping Alert:";
pub const EMAIL_ALERT_SUBJECT: &str = "CJ Token Refresh Failure";

// user facing
pub const TRY_AGAIN_LATER_MSG: &str = "Service temporarily unavailable, please try again later.";
