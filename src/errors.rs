use thiserror::Error;

/// Why a token exchange did not produce a credential.
///
/// `Clone` so every caller joined on the same in-flight exchange gets the result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshFailed {
    /// upstream answered with a non-success `code`
    #[error("Token refresh failed: {message}")]
    Rejected { code: Option<i64>, message: String },

    /// network failure, timeout or a body that is not a token-exchange response
    #[error("Error during refresh: {0}")]
    Transport(String),

    /// the exchange driving this refresh was dropped before it finished
    #[error("token refresh was abandoned before completing")]
    Abandoned,
}

impl RefreshFailed {
    pub fn reason(&self) -> &'static str {
        match self {
            RefreshFailed::Rejected { .. } => "rejected",
            RefreshFailed::Transport(_) => "transport",
            RefreshFailed::Abandoned => "abandoned",
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("upstream call failed: {0}")]
    Transport(#[from] reqwest::Error),
}
