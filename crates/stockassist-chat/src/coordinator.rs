//! Chat operation coordinator.
//!
//! Submits messages, then tracks each operation over two channels: the
//! push listener and a per-operation poll loop. Whichever channel sees the
//! terminal state first applies it to the view; the other is ignored.

use crate::api::{ChatApi, QueuedOperation, SubmitRequest};
use crate::error::{ChatError, ChatResult, ValidationError};
use crate::poller::{PollConfig, Poller};
use crate::state::CoordinatorState;
use crate::view::{ChatMessage, ChatView};
use crate::waiter::OperationWaiter;
use std::sync::Arc;
use std::time::Duration;
use stockassist_core::tokens::DEFAULT_TOKEN_BUDGET;
use stockassist_core::{
    estimate_tokens, ChatId, OperationId, PushEvent, TerminalOutcome, TerminalSource,
    UsageSnapshot,
};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Maximum estimated tokens per message (inclusive).
    pub token_budget: usize,
    pub max_images_per_message: usize,
    /// Delay before refreshing the chat list after a new chat is created.
    pub chat_list_refresh_delay_ms: u64,
    pub poll: PollConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            token_budget: DEFAULT_TOKEN_BUDGET,
            max_images_per_message: 1,
            chat_list_refresh_delay_ms: 150,
            poll: PollConfig::default(),
        }
    }
}

/// A submitted operation.
#[derive(Debug)]
pub struct OperationHandle {
    pub operation_id: OperationId,
    pub chat_id: Option<ChatId>,
    outcome: oneshot::Receiver<TerminalOutcome>,
}

impl OperationHandle {
    /// Wait for the applied outcome. `None` if the coordinator went away
    /// first.
    pub async fn wait(self) -> Option<TerminalOutcome> {
        self.outcome.await.ok()
    }
}

pub struct ChatCoordinator {
    api: Arc<dyn ChatApi>,
    view: Arc<dyn ChatView>,
    state: Arc<CoordinatorState>,
    waiter: Arc<OperationWaiter>,
    poller: Poller,
    config: ChatConfig,
    shutdown: CancellationToken,
}

impl ChatCoordinator {
    pub fn new(api: Arc<dyn ChatApi>, view: Arc<dyn ChatView>, config: ChatConfig) -> Self {
        let state = Arc::new(CoordinatorState::default());
        let waiter = Arc::new(OperationWaiter::new(state.clone()));
        let shutdown = CancellationToken::new();
        let poller = Poller::new(
            api.clone(),
            state.clone(),
            waiter.clone(),
            view.clone(),
            config.poll.clone(),
            shutdown.child_token(),
        );

        Self {
            api,
            view,
            state,
            waiter,
            poller,
            config,
            shutdown,
        }
    }

    pub fn state(&self) -> &Arc<CoordinatorState> {
        &self.state
    }

    pub fn waiter(&self) -> &Arc<OperationWaiter> {
        &self.waiter
    }

    /// Switch to an existing chat without notifying the view.
    pub fn open_chat(&self, chat_id: ChatId) {
        self.state.set_active_chat(chat_id);
    }

    /// Check a request against the local limits.
    pub fn validate(&self, request: &SubmitRequest) -> Result<(), ValidationError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }

        let count = estimate_tokens(message);
        if count > self.config.token_budget {
            return Err(ValidationError::TooManyTokens {
                count,
                budget: self.config.token_budget,
            });
        }

        let images = request.attachments.len();
        if images > self.config.max_images_per_message {
            return Err(ValidationError::TooManyImages {
                count: images,
                max: self.config.max_images_per_message,
            });
        }
        Ok(())
    }

    /// Submit a message and start tracking the resulting operation.
    pub async fn submit(&self, mut request: SubmitRequest) -> ChatResult<OperationHandle> {
        if let Err(e) = self.validate(&request) {
            self.view.show_error(&e.to_string());
            return Err(e.into());
        }

        request.message = request.message.trim().to_string();
        request.symbols = request.symbols.trim().to_string();
        if request.chat_id.is_none() {
            request.chat_id = self.state.active_chat();
        }

        self.view.append_message(ChatMessage::user(
            request.message.clone(),
            request.attachment_labels(),
        ));
        self.view.show_loading();

        let queued = match self.api.queue(&request).await {
            Ok(queued) => queued,
            Err(e) => {
                warn!(error = %e, "Chat submission failed");
                let message = e.to_string();
                self.view.remove_loading();
                self.view.show_error(&message);
                self.view
                    .append_message(ChatMessage::error(format!("Error: {message}")));
                return Err(e);
            }
        };

        info!(
            operation_id = %queued.operation_id,
            chat_id = ?queued.chat_id,
            "Chat operation queued"
        );
        Ok(self.track(queued))
    }

    fn track(&self, queued: QueuedOperation) -> OperationHandle {
        let QueuedOperation {
            operation_id,
            chat_id,
            messages_left,
            ..
        } = queued;

        if let Some(chat_id) = &chat_id {
            self.switch_chat(chat_id.clone());
        }
        if let Some(left) = messages_left {
            self.apply_messages_left(left);
        }

        let (tx, rx) = oneshot::channel();
        let view = self.view.clone();
        let state = self.state.clone();
        self.waiter.on_terminal(
            operation_id.clone(),
            Box::new(move |outcome, source| apply_outcome(&*view, &state, outcome, source, tx)),
        );
        self.state.register(&operation_id);
        self.poller.spawn(operation_id.clone());

        OperationHandle {
            operation_id,
            chat_id,
            outcome: rx,
        }
    }

    fn switch_chat(&self, chat_id: ChatId) {
        let previous = self.state.set_active_chat(chat_id.clone());
        if previous.as_ref() == Some(&chat_id) {
            return;
        }

        debug!(chat_id = %chat_id, previous = ?previous, "Active chat changed");
        self.view.chat_changed(&chat_id);

        if previous.is_none() {
            let view = self.view.clone();
            let delay = Duration::from_millis(self.config.chat_list_refresh_delay_ms);
            let shutdown = self.shutdown.child_token();
            tokio::spawn(async move {
                tokio::select! {
                    () = tokio::time::sleep(delay) => view.refresh_chat_list(),
                    () = shutdown.cancelled() => {}
                }
            });
        }
    }

    fn apply_messages_left(&self, left: i64) {
        if let Some(quota) = self.state.apply_messages_left(left) {
            self.view.update_quota(quota);
        }
    }

    /// Handle one push event. Returns `true` if it settled an operation.
    pub async fn handle_push(&self, event: PushEvent) -> bool {
        let applied = self.waiter.deliver(
            event.operation_id(),
            event.to_outcome(),
            TerminalSource::Push,
        );

        if matches!(event, PushEvent::ChatCompleted { .. }) {
            if let Err(e) = self.refresh_usage().await {
                warn!(error = %e, "Usage refresh failed");
            }
        }
        applied
    }

    /// Consume push events until the channel closes or shutdown.
    pub async fn run_push_listener(&self, mut events: mpsc::Receiver<PushEvent>) {
        info!("Push listener started");
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle_push(event).await;
                    }
                    None => break,
                },
            }
        }
        info!("Push listener stopped");
    }

    /// Fetch usage and push it to the view.
    pub async fn refresh_usage(&self) -> ChatResult<UsageSnapshot> {
        let usage = self.api.usage().await?;
        self.state.set_message_quota(usage.messages);
        self.view.update_usage(&usage);
        Ok(usage)
    }

    /// Stop polling and the push listener. Server-side work is untouched.
    pub fn shutdown(&self) {
        info!(pending = self.state.pending_count(), "Chat coordinator shutting down");
        self.shutdown.cancel();
    }
}

impl Drop for ChatCoordinator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn apply_outcome(
    view: &dyn ChatView,
    state: &CoordinatorState,
    outcome: &TerminalOutcome,
    source: TerminalSource,
    done: oneshot::Sender<TerminalOutcome>,
) {
    view.remove_loading();
    match outcome {
        TerminalOutcome::Completed { text, .. } => {
            view.append_message(ChatMessage::assistant(text.clone()));
            view.refresh_chat_list();
        }
        TerminalOutcome::Failed { error, .. } => {
            view.append_message(ChatMessage::error(error.clone()));
        }
    }

    if let Some(left) = outcome.messages_left() {
        if let Some(quota) = state.apply_messages_left(left) {
            view.update_quota(quota);
        }
    }

    debug!(%source, "Terminal outcome applied");
    // Receiver may be gone; the view is already updated.
    let _ = done.send(outcome.clone());
}
