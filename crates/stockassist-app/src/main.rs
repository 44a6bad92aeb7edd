//! StockAssist terminal client - Entry Point

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use stockassist_app::config::{CONFIG_ENV, DEFAULT_CONFIG_PATH};
use stockassist_app::terminal::render_suggestions;
use stockassist_app::{parse_command, AppConfig, Application, Flow, Session, TerminalView};
use stockassist_chat::ChatView;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// StockAssist terminal client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via STOCKASSIST_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    stockassist_ws::init_crypto();

    let args = Args::parse();

    // Determine config path: CLI arg > STOCKASSIST_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var(CONFIG_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = if Path::new(&config_path).exists() {
        AppConfig::from_file(&config_path)?
    } else {
        AppConfig::default()
    };

    stockassist_telemetry::init_logging(&config.telemetry.log_filter)?;
    info!("Starting StockAssist v{}", env!("CARGO_PKG_VERSION"));
    info!(config_path = %config_path, base_url = %config.base_url, "Configuration loaded");

    let view = Arc::new(TerminalView::stdout());
    let mut app = Application::new(config, view.clone())?;
    app.start()?;

    // Print the dropdown whenever it changes.
    let mut updates = app.suggestions().subscribe();
    let dropdown_view = view.clone();
    let dropdown = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let update = updates.borrow_and_update().clone();
            if let Some(text) = render_suggestions(&update) {
                dropdown_view.print(&text);
            }
        }
    });

    view.print("Type a message, or /help for commands.");
    let mut session = Session::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Input closed");
                    break;
                };
                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(message) => {
                        view.show_error(&message);
                        continue;
                    }
                };
                match session.handle(&app, &view, command).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => break,
                    Err(e) => {
                        warn!(error = %e, "Command failed");
                        view.show_error(&e.to_string());
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    app.shutdown().await;
    dropdown.abort();
    Ok(())
}
