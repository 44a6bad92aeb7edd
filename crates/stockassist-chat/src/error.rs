//! Chat error types.

use thiserror::Error;

/// Submission rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a message.")]
    EmptyMessage,

    #[error("Message is too long ({count}/{budget} tokens). Please shorten it.")]
    TooManyTokens { count: usize, budget: usize },

    #[error("Too many images ({count}/{max}). Remove some and try again.")]
    TooManyImages { count: usize, max: usize },
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// HTTP failure, non-2xx, malformed body or server-side rejection.
    #[error("{0}")]
    Transport(String),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

impl ChatError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

pub type ChatResult<T> = Result<T, ChatError>;
