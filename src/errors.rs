use thiserror::Error;

/// Application-wide error types.
///
/// The variants separate failures that are logged and skipped (network,
/// api, degraded) from those a caller may want to surface (config, io).
#[derive(Debug, Error)]
pub enum AppError {
    // Transport
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    // Credentials
    #[error("{channel} credentials are not configured")]
    AuthMissing { channel: &'static str },

    // Remote services
    #[error("{service} returned an error: {message}")]
    Api { service: &'static str, message: String },
    #[error("malformed response from {service}: {message}")]
    MalformedResponse { service: &'static str, message: String },
    #[error("delivery degraded: {0}")]
    Degraded(String),
    #[error("translation failed: {0}")]
    Translation(String),

    // Feeds
    #[error("unable to parse feed: {0}")]
    FeedParse(#[from] feed_rs::parser::ParseFeedError),

    // Local system
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn api(service: &'static str, message: impl Into<String>) -> Self {
        AppError::Api {
            service,
            message: message.into(),
        }
    }

    pub fn malformed(service: &'static str, message: impl Into<String>) -> Self {
        AppError::MalformedResponse {
            service,
            message: message.into(),
        }
    }

    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            AppError::Api { .. } => true,
            _ => false,
        }
    }
}
