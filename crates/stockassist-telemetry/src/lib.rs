//! Structured logging for StockAssist.
//!
//! Every crate logs through `tracing` with structured fields; the binary
//! calls [`init_logging`] once at startup.

pub mod error;
pub mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, parse_filter, LogFormat, DEFAULT_FILTER};
