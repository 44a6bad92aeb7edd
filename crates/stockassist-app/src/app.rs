//! Application wiring.
//!
//! Connects the pieces the terminal host needs:
//! - REST client shared by the chat API and symbol search
//! - Push connection feeding the coordinator's listener
//! - Chat coordinator and suggestion service

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use stockassist_chat::{ChatCoordinator, ChatView, HttpChatApi};
use stockassist_core::PushEvent;
use stockassist_suggest::{SuggestClient, SuggestionService};
use stockassist_ws::ConnectionManager;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Buffered push events between the socket and the coordinator.
const PUSH_CHANNEL_CAPACITY: usize = 256;

/// How long shutdown waits for background tasks.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Main application.
pub struct Application {
    config: AppConfig,
    coordinator: Arc<ChatCoordinator>,
    suggestions: SuggestionService,
    connection: Arc<ConnectionManager>,
    push_rx: Option<mpsc::Receiver<PushEvent>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Application {
    /// Create a new application. Nothing connects until [`Application::start`].
    pub fn new(config: AppConfig, view: Arc<dyn ChatView>) -> AppResult<Self> {
        let http = build_http_client(config.session_cookie.as_deref())?;

        let api = Arc::new(HttpChatApi::with_client(http.clone(), &config.base_url)?);
        let coordinator = Arc::new(ChatCoordinator::new(api, view, config.chat.clone().into()));

        let source = Arc::new(SuggestClient::with_client(http, &config.base_url)?);
        let suggestions = SuggestionService::new(source, config.suggest.clone().into());

        let (push_tx, push_rx) = mpsc::channel(PUSH_CHANNEL_CAPACITY);
        let ws_config = config.connection_config()?;
        info!(url = %ws_config.url, "Configured push channel");
        let connection = Arc::new(ConnectionManager::new(ws_config, push_tx));

        Ok(Self {
            config,
            coordinator,
            suggestions,
            connection,
            push_rx: Some(push_rx),
            tasks: Vec::new(),
        })
    }

    /// Spawn the push connection and the coordinator's push listener.
    pub fn start(&mut self) -> AppResult<()> {
        let push_rx = self
            .push_rx
            .take()
            .ok_or_else(|| AppError::Config("application already started".to_string()))?;

        let connection = self.connection.clone();
        self.tasks.push(tokio::spawn(async move {
            if let Err(e) = connection.connect().await {
                error!(error = %e, "Push connection gave up, relying on polling");
            }
        }));

        let coordinator = self.coordinator.clone();
        self.tasks.push(tokio::spawn(async move {
            coordinator.run_push_listener(push_rx).await;
        }));

        info!(base_url = %self.config.base_url, "Application started");
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Arc<ChatCoordinator> {
        &self.coordinator
    }

    pub fn suggestions(&self) -> &SuggestionService {
        &self.suggestions
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    /// Stop local tracking and close the socket. Queued server work is
    /// not cancelled.
    pub async fn shutdown(mut self) {
        self.suggestions.dismiss();
        self.coordinator.shutdown();
        self.connection.shutdown();

        for task in self.tasks.drain(..) {
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Background task failed"),
                Err(_) => warn!("Background task did not stop in time"),
            }
        }
        info!("Application stopped");
    }
}

/// Shared REST client, carrying the session cookie if configured.
fn build_http_client(session_cookie: Option<&str>) -> AppResult<Client> {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = session_cookie {
        let value = HeaderValue::from_str(cookie)
            .map_err(|e| AppError::Config(format!("Invalid session_cookie: {e}")))?;
        headers.insert(COOKIE, value);
    }

    Ok(Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(30))
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_rejects_bad_cookie() {
        assert!(build_http_client(None).is_ok());
        assert!(build_http_client(Some("session=abc")).is_ok());
        assert!(matches!(
            build_http_client(Some("bad\ncookie")),
            Err(AppError::Config(_))
        ));
    }
}
