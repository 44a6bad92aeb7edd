//! Line-oriented terminal rendering of the chat view.

use chrono::Utc;
use parking_lot::Mutex;
use std::io::Write;
use stockassist_chat::{ChatMessage, ChatView, MessageRole, StepProgress, StepState};
use stockassist_core::{ChatId, Quota, QuotaLevel, UsageSnapshot};
use stockassist_suggest::SuggestionUpdate;
use tracing::warn;

/// Maximum dropdown rows printed for one suggestion update.
const MAX_SUGGESTION_ROWS: usize = 8;

/// `ChatView` that prints one line per event.
pub struct TerminalView {
    out: Mutex<Box<dyn Write + Send>>,
}

impl TerminalView {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Print a line; a broken terminal is logged, not fatal.
    pub fn print(&self, line: &str) {
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            warn!(error = %e, "Terminal write failed");
        }
    }
}

impl ChatView for TerminalView {
    fn append_message(&self, message: ChatMessage) {
        self.print(&render_message(&message));
    }

    fn show_loading(&self) {
        self.print("... thinking");
    }

    fn remove_loading(&self) {}

    fn show_progress(&self, progress: &StepProgress) {
        self.print(&render_progress(progress));
    }

    fn show_error(&self, message: &str) {
        self.print(&format!("! {message}"));
    }

    fn chat_changed(&self, chat_id: &ChatId) {
        self.print(&format!("[chat {chat_id}]"));
    }

    fn refresh_chat_list(&self) {}

    fn update_quota(&self, messages: Quota) {
        self.print(&render_quota("messages", messages));
    }

    fn update_usage(&self, usage: &UsageSnapshot) {
        self.print(&render_usage(usage));
    }
}

pub fn render_message(message: &ChatMessage) -> String {
    let prefix = match message.role {
        MessageRole::User => "you",
        MessageRole::Assistant => "assistant",
        MessageRole::Error => "error",
    };
    let mut line = format!("{prefix}> {}", message.text);
    for label in &message.attachments {
        line.push_str(&format!(" [{label}]"));
    }
    line
}

pub fn render_progress(progress: &StepProgress) -> String {
    let steps: Vec<String> = progress
        .steps
        .iter()
        .map(|(description, state)| {
            let mark = match state {
                StepState::Done => "x",
                StepState::Active => ">",
                StepState::Upcoming => " ",
            };
            format!("[{mark}] {description}")
        })
        .collect();

    if steps.is_empty() {
        format!("... {}", progress.current)
    } else {
        format!("... {} | {}", progress.current, steps.join(" "))
    }
}

pub fn render_quota(label: &str, quota: Quota) -> String {
    let marker = match quota.level() {
        QuotaLevel::Normal => "",
        QuotaLevel::Warning => " (!)",
        QuotaLevel::Critical => " (!!)",
    };
    format!("{label}: {quota}{marker}")
}

pub fn render_usage(usage: &UsageSnapshot) -> String {
    format!(
        "{}, {}, resets in {}",
        render_quota("messages", usage.messages),
        render_quota("images", usage.images),
        usage.reset_countdown(Utc::now())
    )
}

/// Dropdown text for a suggestion update; `None` when hidden.
pub fn render_suggestions(update: &SuggestionUpdate) -> Option<String> {
    let SuggestionUpdate::Ready {
        query, suggestions, ..
    } = update
    else {
        return None;
    };

    if suggestions.is_empty() {
        return Some(format!("  no matches for '{query}'"));
    }

    let rows: Vec<String> = suggestions
        .iter()
        .take(MAX_SUGGESTION_ROWS)
        .map(|s| {
            let marker = if s.is_preferred_match || s.is_exact_term_match {
                "*"
            } else {
                " "
            };
            format!(
                " {marker} {:<12} {:<10} {}",
                s.candidate.symbol, s.candidate.exchange, s.candidate.name
            )
        })
        .collect();
    Some(rows.join("\n"))
}
