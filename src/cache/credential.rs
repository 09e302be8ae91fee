use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access/refresh pair for the CJ API.
/// Serialized as the token cache record `{accessToken, refreshToken, updated}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(rename = "updated")]
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            updated_at: Utc::now(),
        }
    }

    /// Credential built from static configuration, dated at the unix epoch so
    /// any refreshed value is newer.
    pub fn seed(access_token: Option<&str>, refresh_token: Option<&str>) -> Option<Self> {
        if access_token.is_none() && refresh_token.is_none() {
            return None;
        }
        Some(Self {
            access_token: access_token.unwrap_or_default().to_owned(),
            refresh_token: refresh_token.unwrap_or_default().to_owned(),
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        })
    }
}
