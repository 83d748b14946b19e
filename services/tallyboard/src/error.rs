//! Error types for the tallyboard service

/// Errors that can occur in the tallyboard service
#[derive(Debug, thiserror::Error)]
pub enum TallyboardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),
}

/// Result type alias for tallyboard operations
pub type Result<T> = std::result::Result<T, TallyboardError>;
