//! Request/response correlation over a fire-and-forget channel

use crate::error::SandboxError;
use crate::sandbox::host::SandboxHost;
use crate::sandbox::message::{InboundMessage, OutboundMessage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

type Resolver = oneshot::Sender<Option<String>>;
type PendingTable = Mutex<HashMap<String, Resolver>>;

fn lock(table: &PendingTable) -> MutexGuard<'_, HashMap<String, Resolver>> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Maps correlation identifiers to the callers awaiting their results
pub struct CallCorrelator {
    pending: Arc<PendingTable>,
    host: Arc<dyn SandboxHost>,
}

impl CallCorrelator {
    /// Create a correlator dispatching through `host`
    pub fn new(host: Arc<dyn SandboxHost>) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            host,
        }
    }

    /// Allocate a pending entry for `id`
    pub fn register(&self, id: impl Into<String>) -> Result<PendingCall, SandboxError> {
        let id = id.into();
        let mut pending = lock(&self.pending);
        if pending.contains_key(&id) {
            return Err(SandboxError::DuplicateIdentifier(id));
        }

        let (sender, receiver) = oneshot::channel();
        pending.insert(id.clone(), sender);
        Ok(PendingCall {
            id,
            receiver,
            table: Arc::downgrade(&self.pending),
        })
    }

    /// Send a message to the isolated context; the result arrives through
    /// [`on_inbound_result`](Self::on_inbound_result)
    pub fn dispatch(&self, message: OutboundMessage) -> Result<(), SandboxError> {
        let id = message.data.message_id.clone();
        if let Err(error) = self.host.post(message) {
            warn!(id = %id, error = %error, "Failed to dispatch evaluation request");
            lock(&self.pending).remove(&id);
            return Err(error);
        }
        Ok(())
    }

    /// Resolve the pending call for `id`. Unknown identifiers are ignored.
    ///
    /// Returns true when a waiting caller received the result.
    pub fn on_inbound_result(&self, id: &str, result: Option<String>) -> bool {
        let resolver = lock(&self.pending).remove(id);
        match resolver {
            Some(resolver) => {
                if resolver.send(result).is_err() {
                    debug!(id = %id, "Caller stopped waiting before the result arrived");
                    return false;
                }
                true
            }
            None => {
                debug!(id = %id, "Ignoring result without a pending call");
                false
            }
        }
    }

    /// Route an inbound envelope; messages for other targets are ignored
    pub fn on_inbound_message(&self, message: InboundMessage) -> bool {
        if !message.is_for_background() {
            return false;
        }
        self.on_inbound_result(&message.data.message_id, message.data.result)
    }

    /// Number of calls still awaiting a result
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Drop every pending entry; their callers fail with `CallAbandoned`
    pub fn abandon_all(&self) -> usize {
        let mut pending = lock(&self.pending);
        let count = pending.len();
        pending.clear();
        count
    }
}

/// One outstanding evaluation
///
/// Dropping a `PendingCall` before it resolves removes its table entry, so a
/// timed-out or cancelled caller never leaves a stale resolver behind.
pub struct PendingCall {
    id: String,
    receiver: oneshot::Receiver<Option<String>>,
    table: Weak<PendingTable>,
}

impl PendingCall {
    /// Correlation identifier of this call
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the result, failing with `EvaluationTimeout` after `timeout`
    pub async fn wait(mut self, timeout: Option<Duration>) -> Result<Option<String>, SandboxError> {
        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut self.receiver).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(id = %self.id, timeout = ?limit, "Evaluation timed out");
                    return Err(SandboxError::EvaluationTimeout {
                        id: self.id.clone(),
                        timeout: limit,
                    });
                }
            },
            None => (&mut self.receiver).await,
        };

        outcome.map_err(|_| SandboxError::CallAbandoned(self.id.clone()))
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            lock(&table).remove(&self.id);
        }
    }
}
