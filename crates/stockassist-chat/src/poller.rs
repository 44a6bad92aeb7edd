//! Status polling fallback.
//!
//! Polls `GET /api/chat/status/{id}` while the id is pending: right away,
//! then every `interval_ms`, or `error_interval_ms` after a transport
//! error. Reports step progress and hands terminal statuses to the waiter.

use crate::api::ChatApi;
use crate::state::CoordinatorState;
use crate::view::{ChatView, StepProgress};
use crate::waiter::OperationWaiter;
use std::sync::Arc;
use std::time::Duration;
use stockassist_core::{OperationId, TerminalSource};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shown when polling gives up while the push channel may still deliver.
pub const POLL_ABANDONED_NOTICE: &str =
    "Lost contact with the server. The reply will appear here when it arrives.";

/// Polling configuration.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between polls after a successful response.
    pub interval_ms: u64,
    /// Delay after a transport error.
    pub error_interval_ms: u64,
    /// Consecutive transport errors before polling stops (0 = never).
    pub max_consecutive_errors: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1500,
            error_interval_ms: 3000,
            max_consecutive_errors: 20,
        }
    }
}

/// How a poll loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    /// This loop delivered the terminal status.
    Delivered,
    /// The id was settled elsewhere (push, or a duplicate poll).
    NoLongerPending,
    /// Too many consecutive transport errors.
    Abandoned,
    Shutdown,
}

/// Spawns one poll loop per submitted operation.
#[derive(Clone)]
pub struct Poller {
    api: Arc<dyn ChatApi>,
    state: Arc<CoordinatorState>,
    waiter: Arc<OperationWaiter>,
    view: Arc<dyn ChatView>,
    config: PollConfig,
    shutdown: CancellationToken,
}

impl Poller {
    pub fn new(
        api: Arc<dyn ChatApi>,
        state: Arc<CoordinatorState>,
        waiter: Arc<OperationWaiter>,
        view: Arc<dyn ChatView>,
        config: PollConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            api,
            state,
            waiter,
            view,
            config,
            shutdown,
        }
    }

    pub fn spawn(&self, operation_id: OperationId) -> JoinHandle<PollExit> {
        let poller = self.clone();
        tokio::spawn(async move { poller.run(operation_id).await })
    }

    pub async fn run(&self, operation_id: OperationId) -> PollExit {
        let mut consecutive_errors = 0u32;

        loop {
            if self.shutdown.is_cancelled() {
                return PollExit::Shutdown;
            }
            if !self.state.is_pending(&operation_id) {
                debug!(operation_id = %operation_id, "Stopping poll, operation settled");
                return PollExit::NoLongerPending;
            }

            let delay = match self.api.status(&operation_id).await {
                Ok(status) => {
                    consecutive_errors = 0;
                    if !self.state.is_pending(&operation_id) {
                        return PollExit::NoLongerPending;
                    }

                    if let Some(progress) = StepProgress::from_status(&status) {
                        self.view.show_progress(&progress);
                    }

                    if let Some(outcome) = status.terminal_outcome() {
                        return if self
                            .waiter
                            .deliver(&operation_id, outcome, TerminalSource::Poll)
                        {
                            PollExit::Delivered
                        } else {
                            PollExit::NoLongerPending
                        };
                    }

                    debug!(
                        operation_id = %operation_id,
                        status = ?status.status,
                        step = ?status.current_step,
                        "Operation still running"
                    );
                    self.config.interval_ms
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(
                        operation_id = %operation_id,
                        attempt = consecutive_errors,
                        error = %e,
                        "Status poll failed"
                    );

                    if self.config.max_consecutive_errors > 0
                        && consecutive_errors >= self.config.max_consecutive_errors
                    {
                        // Left pending: a push can still settle it.
                        warn!(
                            operation_id = %operation_id,
                            "Abandoning status polling"
                        );
                        self.view.show_error(POLL_ABANDONED_NOTICE);
                        return PollExit::Abandoned;
                    }
                    self.config.error_interval_ms
                }
            };

            tokio::select! {
                () = tokio::time::sleep(Duration::from_millis(delay)) => {}
                () = self.shutdown.cancelled() => {
                    info!(operation_id = %operation_id, "Polling stopped by shutdown");
                    return PollExit::Shutdown;
                }
            }
        }
    }
}
