//! Pending join table, keyed by request id.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::oneshot;

use trx_core::wire::JoinStatus;

/// Shared pending-join table
pub type SharedPending = Arc<PendingJoins>;

/// Join requests awaiting a verdict.
///
/// An entry is removed exactly once: either by the response that resolves it
/// or by the timeout that cancels it. Whoever removes it decides the outcome,
/// so a response racing the deadline is either delivered or ignored, never
/// both.
#[derive(Default)]
pub struct PendingJoins {
    waiting: DashMap<String, oneshot::Sender<JoinStatus>>,
}

impl PendingJoins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedPending {
        Arc::new(Self::new())
    }

    /// Start waiting on `request_id`.
    pub fn register(&self, request_id: &str) -> oneshot::Receiver<JoinStatus> {
        let (tx, rx) = oneshot::channel();
        self.waiting.insert(request_id.to_string(), tx);
        rx
    }

    /// Deliver a verdict. Returns false for unknown or already-settled ids.
    pub fn resolve(&self, request_id: &str, status: JoinStatus) -> bool {
        match self.waiting.remove(request_id) {
            Some((_, tx)) => {
                // The waiter may have gone away; nothing to do then.
                let _ = tx.send(status);
                true
            }
            None => {
                tracing::trace!(request_id, "response for unknown join request ignored");
                false
            }
        }
    }

    /// Give up on `request_id`. Returns false if it was already resolved.
    pub fn cancel(&self, request_id: &str) -> bool {
        self.waiting.remove(request_id).is_some()
    }

    pub fn is_pending(&self, request_id: &str) -> bool {
        self.waiting.contains_key(request_id)
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}

/// Cancels its request id when dropped.
pub(crate) struct PendingGuard {
    pending: SharedPending,
    request_id: String,
}

impl PendingGuard {
    pub(crate) fn new(pending: SharedPending, request_id: String) -> Self {
        Self {
            pending,
            request_id,
        }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.cancel(&self.request_id);
    }
}
