//! Terminal host for the StockAssist chat client.
//!
//! Wires the crates together:
//! - TOML configuration
//! - Push connection feeding the chat coordinator
//! - Debounced symbol suggestions
//! - Line-oriented terminal view and command loop

pub mod app;
pub mod config;
pub mod error;
pub mod repl;
pub mod terminal;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repl::{parse_command, Command, Flow, Session};
pub use terminal::TerminalView;
