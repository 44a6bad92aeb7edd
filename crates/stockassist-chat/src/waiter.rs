//! At-most-once dispatch of terminal outcomes.
//!
//! Push and poll both call `deliver`. The first delivery for a pending id
//! settles it and runs the registered callback; every other delivery is a
//! silent no-op. Callbacks run outside all locks.

use crate::state::CoordinatorState;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use stockassist_core::{OperationId, TerminalOutcome, TerminalSource};
use tracing::{debug, info};

/// Callback run once when an operation reaches a terminal state.
pub type TerminalCallback = Box<dyn FnOnce(&TerminalOutcome, TerminalSource) + Send>;

pub struct OperationWaiter {
    state: Arc<CoordinatorState>,
    callbacks: Mutex<HashMap<OperationId, TerminalCallback>>,
}

impl OperationWaiter {
    pub fn new(state: Arc<CoordinatorState>) -> Self {
        Self {
            state,
            callbacks: Mutex::new(HashMap::new()),
        }
    }

    /// Register the callback for `id`. Must precede `CoordinatorState::register`
    /// so no terminal delivery can slip in between.
    pub fn on_terminal(&self, id: OperationId, callback: TerminalCallback) {
        self.callbacks.lock().insert(id, callback);
    }

    /// Deliver a terminal outcome. Returns `true` if this call applied it.
    pub fn deliver(
        &self,
        id: &OperationId,
        outcome: TerminalOutcome,
        source: TerminalSource,
    ) -> bool {
        if !self.state.settle(id, outcome.phase()) {
            debug!(operation_id = %id, %source, "Ignoring terminal delivery");
            return false;
        }

        info!(
            operation_id = %id,
            %source,
            phase = %outcome.phase(),
            "Operation settled"
        );

        let callback = self.callbacks.lock().remove(id);
        if let Some(callback) = callback {
            callback(&outcome, source);
        }
        true
    }

    /// Callbacks still waiting.
    pub fn waiting(&self) -> usize {
        self.callbacks.lock().len()
    }
}
