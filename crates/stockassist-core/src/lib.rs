//! Core domain types for the StockAssist client.
//!
//! This crate provides the types shared by the chat coordinator and the
//! suggestion engine:
//! - `OperationId`, `ChatId`: server-assigned identifiers
//! - `SuggestionCandidate`: one tradable instrument from symbol search
//! - `StatusResponse`, `PushEvent`, `TerminalOutcome`: chat operation payloads
//! - `UsageSnapshot`, `Quota`: daily usage limits
//! - Token estimation for outgoing messages

pub mod error;
pub mod ids;
pub mod operation;
pub mod suggestion;
pub mod tokens;
pub mod usage;

pub use error::{CoreError, Result};
pub use ids::{ChatId, OperationId};
pub use operation::{
    OperationPhase, OperationStatus, PipelineStep, PushEvent, QueueResponse, StatusResponse,
    TerminalOutcome, TerminalSource,
};
pub use suggestion::SuggestionCandidate;
pub use tokens::{estimate_tokens, TokenGauge, TokenLevel};
pub use usage::{Quota, QuotaLevel, UsageSnapshot};
