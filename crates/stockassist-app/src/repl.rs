//! Terminal command loop.
//!
//! Plain lines are sent as chat messages. Slash commands edit the symbol
//! field, attach images, and switch chats.

use crate::app::Application;
use crate::error::AppResult;
use crate::terminal::TerminalView;
use std::path::Path;
use stockassist_chat::{Attachment, ChatView, SubmitRequest};
use stockassist_core::ChatId;
use stockassist_suggest::{append_symbol, selected_symbols, SuggestionUpdate};
use tracing::debug;

pub const HELP: &str = "\
commands:
  <text>            send a message
  /s <symbols>      type into the symbol field (comma separated)
  /pick <n>         append suggestion n to the symbol field
  /attach <path>    attach an image to the next message
  /chat <id>        continue an existing chat
  /usage            show daily usage
  /quit             exit";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Symbols(String),
    Pick(usize),
    Attach(String),
    OpenChat(ChatId),
    Usage,
    Help,
    Quit,
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Send(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "s" | "symbols" => Ok(Command::Symbols(arg.to_string())),
        "pick" => arg
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(Command::Pick)
            .ok_or_else(|| format!("/pick needs a suggestion number, got '{arg}'")),
        "attach" if !arg.is_empty() => Ok(Command::Attach(arg.to_string())),
        "attach" => Err("/attach needs a file path".to_string()),
        "chat" => ChatId::new(arg)
            .map(Command::OpenChat)
            .map_err(|e| format!("/chat: {e}")),
        "usage" => Ok(Command::Usage),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("Unknown command '/{other}', try /help")),
    }
}

/// Guess an image content type from the file extension.
pub fn image_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Whether the loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Per-terminal input state: the symbol field and pending attachments.
#[derive(Debug, Default)]
pub struct Session {
    symbols: String,
    attachments: Vec<Attachment>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbols(&self) -> &str {
        &self.symbols
    }

    pub fn pending_attachments(&self) -> usize {
        self.attachments.len()
    }

    /// Run one command against the application.
    pub async fn handle(
        &mut self,
        app: &Application,
        view: &TerminalView,
        command: Command,
    ) -> AppResult<Flow> {
        match command {
            Command::Send(text) => self.send(app, text).await,
            Command::Symbols(text) => {
                self.symbols = text;
                app.suggestions().on_input(&self.symbols);
            }
            Command::Pick(n) => self.pick(app, view, n),
            Command::Attach(path) => self.attach(view, &path).await?,
            Command::OpenChat(chat_id) => {
                app.coordinator().open_chat(chat_id);
            }
            Command::Usage => {
                if let Err(e) = app.coordinator().refresh_usage().await {
                    view.show_error(&format!("Could not load usage: {e}"));
                }
            }
            Command::Help => view.print(HELP),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    async fn send(&mut self, app: &Application, text: String) {
        let mut request = SubmitRequest::new(text).with_symbols(self.symbols.clone());
        for attachment in &self.attachments {
            request = request.with_attachment(attachment.clone());
        }

        // The coordinator renders every failure itself.
        if let Ok(handle) = app.coordinator().submit(request).await {
            debug!(
                operation_id = %handle.operation_id,
                symbols = ?selected_symbols(&self.symbols),
                "Message queued"
            );
            self.attachments.clear();
        }
        app.suggestions().dismiss();
    }

    fn pick(&mut self, app: &Application, view: &TerminalView, n: usize) {
        let update = app.suggestions().subscribe().borrow().clone();
        let picked = match &update {
            SuggestionUpdate::Ready { suggestions, .. } => {
                n.checked_sub(1).and_then(|idx| suggestions.get(idx))
            }
            SuggestionUpdate::Hidden => None,
        };

        match picked {
            Some(suggestion) => {
                self.symbols = append_symbol(&self.symbols, &suggestion.candidate.symbol);
                app.suggestions().dismiss();
                view.print(&format!("symbols: {}", self.symbols));
            }
            None => view.show_error(&format!("No suggestion #{n}")),
        }
    }

    async fn attach(&mut self, view: &TerminalView, path: &str) -> AppResult<()> {
        let path = Path::new(path);
        let Some(content_type) = image_content_type(path) else {
            view.show_error("Only png, jpeg, gif and webp images can be attached.");
            return Ok(());
        };

        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        view.print(&format!("attached {file_name} ({} bytes)", data.len()));

        self.attachments.push(Attachment {
            file_name,
            content_type: Some(content_type.to_string()),
            data,
        });
        Ok(())
    }
}
