//! Debounced suggestion lookup.
//!
//! Keystrokes arm a timer; only the last keystroke in a burst triggers a
//! fetch. Every fetch takes a request id and its result is published only
//! while that id is still the newest, so a slow response for an old prefix
//! can never overwrite a newer one.

use crate::client::SuggestSource;
use crate::input::active_term;
use crate::ranking::{rank, RankedSuggestion};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Suggestion service configuration.
#[derive(Debug, Clone)]
pub struct SuggestConfig {
    /// Quiet period after the last keystroke before fetching.
    pub debounce_ms: u64,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

/// What the dropdown should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionUpdate {
    Hidden,
    Ready {
        request_id: u64,
        query: String,
        suggestions: Vec<RankedSuggestion>,
    },
}

/// Debounced, sequence-guarded suggestion service.
pub struct SuggestionService {
    config: SuggestConfig,
    fetcher: Fetcher,
    armed: Mutex<Option<JoinHandle<()>>>,
}

impl SuggestionService {
    pub fn new(source: Arc<dyn SuggestSource>, config: SuggestConfig) -> Self {
        let (updates, _) = watch::channel(SuggestionUpdate::Hidden);
        Self {
            config,
            fetcher: Fetcher {
                source,
                latest_request: Arc::new(AtomicU64::new(0)),
                updates: Arc::new(updates),
            },
            armed: Mutex::new(None),
        }
    }

    /// Receiver for dropdown updates.
    pub fn subscribe(&self) -> watch::Receiver<SuggestionUpdate> {
        self.fetcher.updates.subscribe()
    }

    /// Id of the most recently issued request (0 before the first).
    pub fn latest_request_id(&self) -> u64 {
        self.fetcher.latest_request.load(Ordering::SeqCst)
    }

    /// Input changed. Must be called from within a tokio runtime.
    pub fn on_input(&self, text: &str) {
        let term = active_term(text).to_string();
        self.disarm();

        if term.is_empty() {
            self.fetcher.hide();
            return;
        }

        let fetcher = self.fetcher.clone();
        let delay = Duration::from_millis(self.config.debounce_ms);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The fetch outlives the timer: disarming must not cancel it.
            let request_id = fetcher.issue();
            tokio::spawn(fetcher.run(request_id, term));
        });
        *self.armed.lock() = Some(timer);
    }

    /// Input focused: fetch right away if there is a term.
    pub fn on_focus(&self, text: &str) {
        let term = active_term(text).to_string();
        if term.is_empty() {
            return;
        }
        self.disarm();
        let fetcher = self.fetcher.clone();
        let request_id = fetcher.issue();
        tokio::spawn(fetcher.run(request_id, term));
    }

    /// Close the dropdown (selection made, click outside).
    pub fn dismiss(&self) {
        self.disarm();
        self.fetcher.hide();
    }

    fn disarm(&self) {
        if let Some(timer) = self.armed.lock().take() {
            timer.abort();
        }
    }
}

impl Drop for SuggestionService {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[derive(Clone)]
struct Fetcher {
    source: Arc<dyn SuggestSource>,
    latest_request: Arc<AtomicU64>,
    updates: Arc<watch::Sender<SuggestionUpdate>>,
}

impl Fetcher {
    fn issue(&self) -> u64 {
        self.latest_request.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, request_id: u64) -> bool {
        self.latest_request.load(Ordering::SeqCst) == request_id
    }

    /// Hiding supersedes anything in flight.
    fn hide(&self) {
        self.issue();
        self.updates.send_replace(SuggestionUpdate::Hidden);
    }

    async fn run(self, request_id: u64, term: String) {
        let result = self.source.fetch(&term).await;

        if !self.is_latest(request_id) {
            debug!(request_id, term = %term, "Dropping stale suggestions");
            return;
        }

        let update = match result {
            Ok(candidates) if !candidates.is_empty() => SuggestionUpdate::Ready {
                request_id,
                suggestions: rank(&candidates, &term),
                query: term,
            },
            Ok(_) => SuggestionUpdate::Hidden,
            Err(e) => {
                warn!(?e, term = %term, "Suggestion fetch failed");
                SuggestionUpdate::Hidden
            }
        };
        self.updates.send_replace(update);
    }
}
