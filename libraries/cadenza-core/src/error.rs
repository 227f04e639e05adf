/// Core error types for Cadenza
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for Cadenza
#[derive(Error, Debug)]
pub enum CoreError {
    /// A wire message failed structural validation
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Create an invalid message error
    pub fn invalid_message(msg: impl Into<String>) -> Self {
        Self::InvalidMessage(msg.into())
    }
}
