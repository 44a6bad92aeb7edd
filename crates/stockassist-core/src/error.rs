//! Error types for stockassist-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid operation id: {0}")]
    InvalidOperationId(String),

    #[error("Invalid chat id: {0}")]
    InvalidChatId(String),

    #[error("Payload decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
