//! Coordinator state.
//!
//! Owns the operation table, the active chat id and the last known message
//! quota. An operation is pending while its phase is `Pending`; settling it
//! is a single locked check-and-set, so of two racing channels exactly one
//! observes the transition.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use stockassist_core::{ChatId, OperationId, OperationPhase, Quota};
use tracing::{debug, warn};

/// Settled operations remembered for late deliveries.
pub const MAX_SETTLED: usize = 256;

#[derive(Debug, Default)]
struct Inner {
    /// Terminal entries stay so late deliveries are recognised, up to
    /// [`MAX_SETTLED`] of them.
    operations: HashMap<OperationId, OperationPhase>,
    /// Settled ids, oldest first.
    settled: VecDeque<OperationId>,
    active_chat: Option<ChatId>,
    message_quota: Option<Quota>,
}

/// State owned by one coordinator.
#[derive(Debug, Default)]
pub struct CoordinatorState {
    inner: Mutex<Inner>,
}

impl CoordinatorState {
    pub fn new(active_chat: Option<ChatId>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                active_chat,
                ..Default::default()
            }),
        }
    }

    /// Mark a freshly submitted operation as pending.
    ///
    /// Returns `false` if the id is already known.
    pub fn register(&self, id: &OperationId) -> bool {
        let mut inner = self.inner.lock();
        if inner.operations.contains_key(id) {
            warn!(operation_id = %id, "Operation already registered");
            return false;
        }
        inner.operations.insert(id.clone(), OperationPhase::Pending);
        true
    }

    /// Move a pending operation to `phase`.
    ///
    /// Returns `true` for the caller that performed the transition and
    /// `false` for every later or unknown delivery.
    pub fn settle(&self, id: &OperationId, phase: OperationPhase) -> bool {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        match inner.operations.get_mut(id) {
            Some(current) if current.can_transition_to(phase) => *current = phase,
            Some(current) => {
                debug!(operation_id = %id, phase = %current, "Operation already settled");
                return false;
            }
            None => return false,
        }

        if phase.is_terminal() {
            inner.settled.push_back(id.clone());
            while inner.settled.len() > MAX_SETTLED {
                if let Some(oldest) = inner.settled.pop_front() {
                    inner.operations.remove(&oldest);
                }
            }
        }
        true
    }

    pub fn is_pending(&self, id: &OperationId) -> bool {
        self.phase(id) == Some(OperationPhase::Pending)
    }

    pub fn phase(&self, id: &OperationId) -> Option<OperationPhase> {
        self.inner.lock().operations.get(id).copied()
    }

    pub fn pending_count(&self) -> usize {
        self.inner
            .lock()
            .operations
            .values()
            .filter(|p| **p == OperationPhase::Pending)
            .count()
    }

    pub fn active_chat(&self) -> Option<ChatId> {
        self.inner.lock().active_chat.clone()
    }

    /// Set the active chat, returning the previous one.
    pub fn set_active_chat(&self, chat_id: ChatId) -> Option<ChatId> {
        self.inner.lock().active_chat.replace(chat_id)
    }

    pub fn message_quota(&self) -> Option<Quota> {
        self.inner.lock().message_quota
    }

    pub fn set_message_quota(&self, quota: Quota) {
        self.inner.lock().message_quota = Some(quota);
    }

    /// Recompute usage from a `messages_left` count. `None` until a quota
    /// with a known limit has been recorded.
    pub fn apply_messages_left(&self, remaining: i64) -> Option<Quota> {
        let mut inner = self.inner.lock();
        let updated = inner.message_quota?.with_remaining(remaining);
        inner.message_quota = Some(updated);
        Some(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(id: &str) -> OperationId {
        OperationId::new(id).unwrap()
    }

    #[test]
    fn test_settle_is_check_and_clear() {
        let state = CoordinatorState::default();
        let id = op("op-1");

        assert!(!state.settle(&id, OperationPhase::Completed)); // unknown
        assert!(state.register(&id));
        assert!(!state.register(&id));
        assert!(state.is_pending(&id));
        assert_eq!(state.pending_count(), 1);

        assert!(state.settle(&id, OperationPhase::Completed));
        assert!(!state.settle(&id, OperationPhase::Completed));
        assert!(!state.settle(&id, OperationPhase::Failed));
        assert_eq!(state.phase(&id), Some(OperationPhase::Completed));
        assert_eq!(state.pending_count(), 0);
    }

    #[test]
    fn test_settled_operations_are_pruned() {
        let state = CoordinatorState::default();
        let ids: Vec<OperationId> = (0..=MAX_SETTLED).map(|i| op(&format!("op-{i}"))).collect();
        let live = op("op-live");
        assert!(state.register(&live));

        for id in &ids {
            assert!(state.register(id));
            assert!(state.settle(id, OperationPhase::Completed));
        }

        // Oldest settled id is forgotten; late deliveries for it are ignored.
        assert_eq!(state.phase(&ids[0]), None);
        assert!(!state.settle(&ids[0], OperationPhase::Failed));
        assert!(!state.is_pending(&ids[0]));

        assert_eq!(state.phase(&ids[1]), Some(OperationPhase::Completed));
        assert_eq!(state.phase(&ids[MAX_SETTLED]), Some(OperationPhase::Completed));
        assert!(state.is_pending(&live));
        assert_eq!(state.pending_count(), 1);
        assert_eq!(state.inner.lock().operations.len(), MAX_SETTLED + 1);
    }

    #[test]
    fn test_concurrent_settle_has_one_winner() {
        let state = std::sync::Arc::new(CoordinatorState::default());
        let id = op("op-race");
        state.register(&id);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let state = state.clone();
                let id = id.clone();
                std::thread::spawn(move || {
                    let phase = if i % 2 == 0 {
                        OperationPhase::Completed
                    } else {
                        OperationPhase::Failed
                    };
                    state.settle(&id, phase)
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_active_chat_and_quota() {
        let state = CoordinatorState::new(None);
        assert_eq!(state.apply_messages_left(3), None);

        assert_eq!(state.set_active_chat(ChatId::from(7)), None);
        assert_eq!(
            state.set_active_chat(ChatId::from(8)),
            Some(ChatId::from(7))
        );

        state.set_message_quota(Quota::new(1, 10));
        assert_eq!(state.apply_messages_left(4), Some(Quota::new(6, 10)));
        assert_eq!(state.message_quota(), Some(Quota::new(6, 10)));
    }
}
