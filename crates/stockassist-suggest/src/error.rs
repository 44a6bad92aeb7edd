//! Suggestion error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SuggestError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SuggestResult<T> = Result<T, SuggestError>;

/// Ranking input problems. Logged, never returned: ranking always yields a list.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RankingInputError {
    #[error("no search term in query or candidates")]
    NoSearchTerm,
}
