//! Telemetry error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Logging initialization failed: {0}")]
    LoggingInit(String),
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;
