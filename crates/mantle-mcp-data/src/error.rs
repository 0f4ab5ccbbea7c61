use thiserror::Error;

/// Errors returned by the upstream data clients.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid parameters: {0}")]
    Validation(String),

    #[error("Upstream returned an error: {0}")]
    Upstream(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
