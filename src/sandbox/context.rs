//! Lifecycle of the single isolated execution context

use crate::core::retry::{RetryConfig, RetryExecutor};
use crate::error::SandboxError;
use crate::sandbox::host::SandboxHost;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

type Creation = Shared<BoxFuture<'static, Result<(), String>>>;

/// Observable lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPhase {
    Absent,
    Creating,
    Ready,
}

enum ContextState {
    Absent,
    Creating(Creation),
    Ready,
}

impl ContextState {
    fn phase(&self) -> ContextPhase {
        match self {
            ContextState::Absent => ContextPhase::Absent,
            ContextState::Creating(_) => ContextPhase::Creating,
            ContextState::Ready => ContextPhase::Ready,
        }
    }
}

/// Ensures exactly one isolated context exists, creating it on demand
///
/// Concurrent callers that arrive while a creation is in flight await that
/// same creation instead of starting their own.
pub struct IsolatedContextManager {
    host: Arc<dyn SandboxHost>,
    state: Mutex<ContextState>,
    retry: RetryConfig,
    creations: AtomicU64,
}

impl IsolatedContextManager {
    /// Create a manager for `host`
    pub fn new(host: Arc<dyn SandboxHost>, retry: RetryConfig) -> Self {
        Self {
            host,
            state: Mutex::new(ContextState::Absent),
            retry,
            creations: AtomicU64::new(0),
        }
    }

    /// Make sure the context exists
    pub async fn ensure_ready(&self) -> Result<(), SandboxError> {
        let creation = {
            let mut state = self.state.lock().await;
            let in_flight = match &*state {
                ContextState::Creating(creation) => Some(creation.clone()),
                ContextState::Absent | ContextState::Ready => None,
            };

            match in_flight {
                Some(creation) => {
                    debug!("Context creation in flight, waiting");
                    creation
                }
                None => {
                    if self.host.has_context().await? {
                        *state = ContextState::Ready;
                        return Ok(());
                    }
                    if state.phase() == ContextPhase::Ready {
                        warn!("Sandbox context disappeared, recreating");
                    }
                    let creation = self.start_creation();
                    *state = ContextState::Creating(creation.clone());
                    creation
                }
            }
        };

        let outcome = creation.clone().await;

        {
            let mut state = self.state.lock().await;
            if let ContextState::Creating(current) = &*state {
                if current.ptr_eq(&creation) {
                    *state = if outcome.is_ok() {
                        ContextState::Ready
                    } else {
                        ContextState::Absent
                    };
                }
            }
        }

        outcome.map_err(SandboxError::ContextCreation)
    }

    /// Current lifecycle phase
    pub async fn phase(&self) -> ContextPhase {
        self.state.lock().await.phase()
    }

    /// Number of creation operations issued so far
    pub fn creations(&self) -> u64 {
        self.creations.load(Ordering::SeqCst)
    }

    fn start_creation(&self) -> Creation {
        let attempt = self.creations.fetch_add(1, Ordering::SeqCst) + 1;
        info!(attempt, "Creating sandbox context");

        let host = self.host.clone();
        let executor = RetryExecutor::with_config(self.retry.clone());
        async move {
            executor
                .execute(|| {
                    let host = host.clone();
                    Box::pin(async move { host.create_context().await })
                })
                .await
                .map_err(|error| {
                    warn!(error = %error, "Sandbox context creation failed");
                    match error {
                        SandboxError::ContextCreation(message) => message,
                        other => other.to_string(),
                    }
                })
        }
        .boxed()
        .shared()
    }
}
