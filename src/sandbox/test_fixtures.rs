use crate::error::SandboxError;
use crate::sandbox::client::ScriptEvaluationClient;
use crate::sandbox::host::SandboxHost;
use crate::sandbox::message::{EvaluationRequest, InboundMessage, OutboundMessage};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// In-memory host that records posted requests and counts creations
pub struct ScriptedHost {
    alive: AtomicBool,
    creations: AtomicU32,
    failing_creations: AtomicU32,
    creation_delay: Duration,
    reject_posts: AtomicBool,
    cancelled: Mutex<Vec<String>>,
    posted: mpsc::UnboundedSender<OutboundMessage>,
}

impl ScriptedHost {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<OutboundMessage>) {
        Self::with_creation_delay(Duration::ZERO)
    }

    pub fn with_creation_delay(
        creation_delay: Duration,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (posted, receiver) = mpsc::unbounded_channel();
        let host = Arc::new(Self {
            alive: AtomicBool::new(false),
            creations: AtomicU32::new(0),
            failing_creations: AtomicU32::new(0),
            creation_delay,
            reject_posts: AtomicBool::new(false),
            cancelled: Mutex::new(Vec::new()),
            posted,
        });
        (host, receiver)
    }

    pub fn creations(&self) -> u32 {
        self.creations.load(Ordering::SeqCst)
    }

    pub fn fail_next_creations(&self, count: u32) {
        self.failing_creations.store(count, Ordering::SeqCst);
    }

    pub fn reject_posts(&self, reject: bool) {
        self.reject_posts.store(reject, Ordering::SeqCst);
    }

    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Identifiers passed to `cancel`, in order
    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SandboxHost for ScriptedHost {
    async fn has_context(&self) -> Result<bool, SandboxError> {
        Ok(self.alive.load(Ordering::SeqCst))
    }

    async fn create_context(&self) -> Result<(), SandboxError> {
        self.creations.fetch_add(1, Ordering::SeqCst);
        if !self.creation_delay.is_zero() {
            tokio::time::sleep(self.creation_delay).await;
        }

        let failing = self.failing_creations.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_creations.store(failing - 1, Ordering::SeqCst);
            return Err(SandboxError::ContextCreation("scripted failure".to_string()));
        }

        if self.alive.swap(true, Ordering::SeqCst) {
            return Err(SandboxError::ContextExists);
        }
        Ok(())
    }

    fn post(&self, message: OutboundMessage) -> Result<(), SandboxError> {
        if self.reject_posts.load(Ordering::SeqCst) {
            return Err(SandboxError::Dispatch("transport closed".to_string()));
        }
        self.posted
            .send(message)
            .map_err(|e| SandboxError::Dispatch(e.to_string()))
    }

    fn cancel(&self, message_id: &str) {
        self.cancelled.lock().unwrap().push(message_id.to_string());
    }
}

/// Answer every posted request in arrival order using `answer`
pub fn spawn_responder<F>(
    client: Arc<ScriptEvaluationClient>,
    mut posted: mpsc::UnboundedReceiver<OutboundMessage>,
    answer: F,
) -> JoinHandle<()>
where
    F: Fn(&EvaluationRequest) -> Option<String> + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(message) = posted.recv().await {
            let result = answer(&message.data);
            client.handle_inbound(InboundMessage::result(message.data.message_id, result));
        }
    })
}
