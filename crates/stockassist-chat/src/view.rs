//! UI sink for the chat coordinator.

use parking_lot::Mutex;
use stockassist_core::{ChatId, Quota, StatusResponse, UsageSnapshot};

/// Who a chat message is from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
    /// Failure text, styled distinctly.
    Error,
}

/// One message appended to the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub text: String,
    /// File names of attached images.
    pub attachments: Vec<String>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>, attachments: Vec<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
            attachments,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Error,
            text: text.into(),
            attachments: Vec::new(),
        }
    }
}

/// Position of a pipeline step relative to the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Done,
    Active,
    Upcoming,
}

/// Progress through the server's pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepProgress {
    pub current: String,
    pub steps: Vec<(String, StepState)>,
}

impl StepProgress {
    /// Progress for a status response; `None` without a current step.
    ///
    /// When `current_step` matches no step description every step is
    /// reported as upcoming.
    pub fn from_status(status: &StatusResponse) -> Option<Self> {
        let current = status.current_step.as_deref().filter(|s| !s.is_empty())?;
        let active = status
            .steps()
            .iter()
            .position(|step| step.description == current);

        let steps = status
            .steps()
            .iter()
            .enumerate()
            .map(|(idx, step)| {
                let state = match active {
                    Some(a) if idx < a => StepState::Done,
                    Some(a) if idx == a => StepState::Active,
                    _ => StepState::Upcoming,
                };
                (step.description.clone(), state)
            })
            .collect();

        Some(Self {
            current: current.to_string(),
            steps,
        })
    }
}

/// Everything the coordinator asks of the user interface.
pub trait ChatView: Send + Sync {
    fn append_message(&self, message: ChatMessage);
    fn show_loading(&self);
    fn remove_loading(&self);
    fn show_progress(&self, progress: &StepProgress);
    /// Transient notification.
    fn show_error(&self, message: &str);
    fn chat_changed(&self, chat_id: &ChatId);
    fn refresh_chat_list(&self);
    fn update_quota(&self, messages: Quota);
    fn update_usage(&self, usage: &UsageSnapshot);
}

/// A recorded `ChatView` call.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Message(ChatMessage),
    Loading,
    LoadingRemoved,
    Progress(StepProgress),
    Error(String),
    ChatChanged(ChatId),
    ChatListRefreshed,
    Quota(Quota),
    Usage(UsageSnapshot),
}

/// View that records every call. Used by tests and headless hosts.
#[derive(Debug, Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().clone()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Message(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Error(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&ViewEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }

    fn push(&self, event: ViewEvent) {
        self.events.lock().push(event);
    }
}

impl ChatView for RecordingView {
    fn append_message(&self, message: ChatMessage) {
        self.push(ViewEvent::Message(message));
    }

    fn show_loading(&self) {
        self.push(ViewEvent::Loading);
    }

    fn remove_loading(&self) {
        self.push(ViewEvent::LoadingRemoved);
    }

    fn show_progress(&self, progress: &StepProgress) {
        self.push(ViewEvent::Progress(progress.clone()));
    }

    fn show_error(&self, message: &str) {
        self.push(ViewEvent::Error(message.to_string()));
    }

    fn chat_changed(&self, chat_id: &ChatId) {
        self.push(ViewEvent::ChatChanged(chat_id.clone()));
    }

    fn refresh_chat_list(&self) {
        self.push(ViewEvent::ChatListRefreshed);
    }

    fn update_quota(&self, messages: Quota) {
        self.push(ViewEvent::Quota(messages));
    }

    fn update_usage(&self, usage: &UsageSnapshot) {
        self.push(ViewEvent::Usage(usage.clone()));
    }
}
