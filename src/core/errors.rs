use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Missing credentials: {0}")]
    CredentialsMissing(&'static str),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Request failed: {status} - {body}")]
    RequestError { status: u16, body: String },

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Subscription error: {0}")]
    SubscriptionError(#[from] SubscriptionError),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),
}

impl ExchangeError {
    /// HTTP status of a failed one-shot call, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestError { status, .. } => Some(*status),
            Self::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::HttpError(e) if e.is_timeout())
    }
}

/// Join/leave attempted outside of a live connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("cannot change subscription for {channel}: stream is not connected")]
    NotConnected { channel: String },

    #[error("stream supervisor is not running")]
    Stopped,
}
