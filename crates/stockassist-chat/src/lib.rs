//! Chat operation coordinator for the StockAssist client.
//!
//! A submitted message becomes a server-side operation that finishes
//! asynchronously. The coordinator tracks it over two channels, a push
//! listener and a status poll, and applies the terminal result exactly once:
//!
//! - `ChatCoordinator`: validation, submission, push handling
//! - `CoordinatorState`: operation table, active chat, message quota
//! - `OperationWaiter`: at-most-once terminal dispatch
//! - `Poller`: status polling fallback
//! - `ChatApi` / `HttpChatApi`: REST endpoints
//! - `ChatView`: the UI sink

pub mod api;
pub mod coordinator;
pub mod error;
pub mod poller;
pub mod state;
pub mod view;
pub mod waiter;

pub use api::{Attachment, ChatApi, HttpChatApi, QueuedOperation, SubmitRequest};
pub use coordinator::{ChatConfig, ChatCoordinator, OperationHandle};
pub use error::{ChatError, ChatResult, ValidationError};
pub use poller::{PollConfig, PollExit, Poller, POLL_ABANDONED_NOTICE};
pub use state::CoordinatorState;
pub use view::{ChatMessage, ChatView, MessageRole, RecordingView, StepProgress, StepState, ViewEvent};
pub use waiter::{OperationWaiter, TerminalCallback};
