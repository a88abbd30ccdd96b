//! Correlation of outbound calls with their responses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time;

use clawdash_core::{CallId, DashError, DashResult, RpcError, AUTH_CALL_ID};

pub type CallOutcome = Result<Value, RpcError>;

/// Monotonic per-session call id source. Ids below and including
/// [`AUTH_CALL_ID`] are never handed out.
#[derive(Debug)]
pub struct CallIds {
    next: AtomicU64,
}

impl Default for CallIds {
    fn default() -> Self {
        Self {
            next: AtomicU64::new(AUTH_CALL_ID.0 + 1),
        }
    }
}

impl CallIds {
    pub fn next(&self) -> CallId {
        CallId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Calls awaiting a response on one connection.
#[derive(Debug, Clone, Default)]
pub struct PendingCalls {
    slots: Arc<Mutex<HashMap<CallId, oneshot::Sender<CallOutcome>>>>,
}

impl PendingCalls {
    fn slots(&self) -> MutexGuard<'_, HashMap<CallId, oneshot::Sender<CallOutcome>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a slot for `id`. Registering an id twice replaces the older slot.
    pub fn register(&self, id: CallId) -> oneshot::Receiver<CallOutcome> {
        let (tx, rx) = oneshot::channel();
        self.slots().insert(id, tx);
        rx
    }

    /// Deliver a response. Returns `false` when no call was waiting on `id`.
    pub fn resolve(&self, id: CallId, outcome: CallOutcome) -> bool {
        match self.slots().remove(&id) {
            Some(tx) => {
                // The waiter may have given up already.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    pub fn forget(&self, id: CallId) {
        self.slots().remove(&id);
    }

    /// Drop every slot; their waiters observe a closed link.
    pub fn fail_all(&self) {
        let dropped = std::mem::take(&mut *self.slots());
        if !dropped.is_empty() {
            tracing::debug!(count = dropped.len(), "failing pending calls");
        }
    }

    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }

    /// Wait for the response to `id`, giving up after `timeout`.
    pub async fn wait(
        &self,
        id: CallId,
        rx: oneshot::Receiver<CallOutcome>,
        timeout: Duration,
    ) -> DashResult<Value> {
        match time::timeout(timeout, rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(DashError::Rpc {
                code: err.code,
                message: err.message,
            }),
            Ok(Err(_)) => Err(DashError::Transport(
                "connection closed before response".into(),
            )),
            Err(_) => {
                self.forget(id);
                Err(DashError::Timeout)
            }
        }
    }
}
