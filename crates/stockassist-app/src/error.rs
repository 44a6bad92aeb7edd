//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] stockassist_ws::WsError),

    #[error("Chat error: {0}")]
    Chat(#[from] stockassist_chat::ChatError),

    #[error("Suggestion error: {0}")]
    Suggest(#[from] stockassist_suggest::SuggestError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] stockassist_telemetry::TelemetryError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
