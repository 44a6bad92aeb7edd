//! Structured logging initialization.

use crate::error::{TelemetryError, TelemetryResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_FILTER: &str = "info,stockassist=debug";

/// Output format of the log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// JSON when `RUST_ENV=production`, pretty otherwise.
    pub fn from_env() -> Self {
        Self::for_environment(std::env::var("RUST_ENV").ok().as_deref())
    }

    fn for_environment(rust_env: Option<&str>) -> Self {
        match rust_env {
            Some("production") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Parse filter directives, reporting which string was rejected.
pub fn parse_filter(directives: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(directives).map_err(|e| TelemetryError::InvalidFilter {
        filter: directives.to_string(),
        reason: e.to_string(),
    })
}

/// Initialize structured logging.
///
/// `RUST_LOG` wins over `default_filter`; an empty `default_filter` falls
/// back to [`DEFAULT_FILTER`]. Fails if a global subscriber is already set.
pub fn init_logging(default_filter: &str) -> TelemetryResult<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if default_filter.trim().is_empty() => parse_filter(DEFAULT_FILTER)?,
        Err(_) => parse_filter(default_filter)?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match LogFormat::from_env() {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_names(true),
            )
            .try_init(),
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}
