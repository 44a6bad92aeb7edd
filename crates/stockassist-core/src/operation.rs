//! Chat operation payloads and lifecycle.
//!
//! An operation moves `Submitted -> Pending -> {Completed | Failed}`.
//! Terminal phases are absorbing. Terminal results arrive either as a
//! push event or as a status poll response; both normalise into a
//! `TerminalOutcome`.

use crate::error::Result;
use crate::ids::{ChatId, OperationId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Push event name for a successful operation.
pub const EVENT_CHAT_COMPLETED: &str = "chat_completed";
/// Push event name for a failed operation.
pub const EVENT_CHAT_ERROR: &str = "chat_error";

/// Fallback error text when the server reports failure without detail.
const DEFAULT_FAILURE_TEXT: &str = "Operation failed";

// ============================================================================
// Lifecycle
// ============================================================================

/// Client-side phase of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationPhase {
    /// Submission accepted, not yet registered.
    Submitted,
    /// Awaiting a terminal signal.
    Pending,
    /// Completed successfully (absorbing).
    Completed,
    /// Failed (absorbing).
    Failed,
}

impl OperationPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving to `next` is a legal transition.
    pub fn can_transition_to(&self, next: OperationPhase) -> bool {
        matches!(
            (self, next),
            (Self::Submitted, Self::Pending)
                | (Self::Pending, Self::Completed)
                | (Self::Pending, Self::Failed)
        )
    }
}

impl fmt::Display for OperationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted => write!(f, "SUBMITTED"),
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Which channel observed a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalSource {
    Push,
    Poll,
}

impl fmt::Display for TerminalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::Poll => write!(f, "poll"),
        }
    }
}

/// Normalised terminal result of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalOutcome {
    /// Assistant response text.
    Completed {
        text: String,
        messages_left: Option<i64>,
    },
    /// Server-reported failure.
    Failed {
        error: String,
        messages_left: Option<i64>,
    },
}

impl TerminalOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Text to show in the chat view (response or error).
    pub fn text(&self) -> &str {
        match self {
            Self::Completed { text, .. } => text,
            Self::Failed { error, .. } => error,
        }
    }

    pub fn messages_left(&self) -> Option<i64> {
        match self {
            Self::Completed { messages_left, .. } | Self::Failed { messages_left, .. } => {
                *messages_left
            }
        }
    }

    /// Phase this outcome settles the operation into.
    pub fn phase(&self) -> OperationPhase {
        if self.is_success() {
            OperationPhase::Completed
        } else {
            OperationPhase::Failed
        }
    }
}

// ============================================================================
// Queue endpoint
// ============================================================================

/// Response of `POST /api/chat/queue`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueResponse {
    #[serde(default)]
    pub operation_id: Option<OperationId>,
    #[serde(default)]
    pub chat_id: Option<ChatId>,
    #[serde(default)]
    pub messages_left: Option<i64>,
    #[serde(default)]
    pub images_left: Option<i64>,
    /// Server-side rejection message.
    #[serde(default)]
    pub error: Option<String>,
}

// ============================================================================
// Status endpoint
// ============================================================================

/// Server-side status of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    /// Any status this client does not know; treated as non-terminal.
    #[serde(other)]
    Unknown,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One step of the server's multi-step pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStep {
    pub description: String,
}

/// Response of `GET /api/chat/status/{operation_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: OperationStatus,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub steps: Option<Vec<PipelineStep>>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl StatusResponse {
    /// Pipeline steps, empty when the server reports none.
    pub fn steps(&self) -> &[PipelineStep] {
        self.steps.as_deref().unwrap_or(&[])
    }

    /// Terminal outcome if the status is terminal.
    pub fn terminal_outcome(&self) -> Option<TerminalOutcome> {
        match self.status {
            OperationStatus::Completed => Some(TerminalOutcome::Completed {
                text: self.result.clone().unwrap_or_default(),
                messages_left: None,
            }),
            OperationStatus::Failed => Some(TerminalOutcome::Failed {
                error: self
                    .error
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FAILURE_TEXT.to_string()),
                messages_left: None,
            }),
            _ => None,
        }
    }
}

// ============================================================================
// Push events
// ============================================================================

#[derive(Debug, Deserialize)]
struct CompletedPayload {
    operation_id: OperationId,
    #[serde(default)]
    response: String,
    #[serde(default)]
    messages_left: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    operation_id: OperationId,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages_left: Option<i64>,
}

/// Terminal notification delivered over the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    ChatCompleted {
        operation_id: OperationId,
        response: String,
        messages_left: Option<i64>,
    },
    ChatError {
        operation_id: OperationId,
        error: String,
        messages_left: Option<i64>,
    },
}

impl PushEvent {
    /// Decode a named event. Returns `Ok(None)` for events this client
    /// does not consume.
    pub fn from_parts(event: &str, data: serde_json::Value) -> Result<Option<Self>> {
        match event {
            EVENT_CHAT_COMPLETED => {
                let p: CompletedPayload = serde_json::from_value(data)?;
                Ok(Some(Self::ChatCompleted {
                    operation_id: p.operation_id,
                    response: p.response,
                    messages_left: p.messages_left,
                }))
            }
            EVENT_CHAT_ERROR => {
                let p: ErrorPayload = serde_json::from_value(data)?;
                Ok(Some(Self::ChatError {
                    operation_id: p.operation_id,
                    error: p.error.unwrap_or_else(|| DEFAULT_FAILURE_TEXT.to_string()),
                    messages_left: p.messages_left,
                }))
            }
            _ => Ok(None),
        }
    }

    pub fn operation_id(&self) -> &OperationId {
        match self {
            Self::ChatCompleted { operation_id, .. } | Self::ChatError { operation_id, .. } => {
                operation_id
            }
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            Self::ChatCompleted { .. } => EVENT_CHAT_COMPLETED,
            Self::ChatError { .. } => EVENT_CHAT_ERROR,
        }
    }

    pub fn to_outcome(&self) -> TerminalOutcome {
        match self {
            Self::ChatCompleted {
                response,
                messages_left,
                ..
            } => TerminalOutcome::Completed {
                text: response.clone(),
                messages_left: *messages_left,
            },
            Self::ChatError {
                error,
                messages_left,
                ..
            } => TerminalOutcome::Failed {
                error: error.clone(),
                messages_left: *messages_left,
            },
        }
    }
}
