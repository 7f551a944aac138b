//! Isolated execution context backed by an embedded V8 (`deno_core`)
//!
//! The runtime lives on its own OS thread with a single-threaded tokio
//! runtime; requests arrive over a command channel and each produces exactly
//! one [`InboundMessage`] on the outbound channel handed out by
//! [`DenoSandboxHost::new`].

use crate::error::SandboxError;
use crate::sandbox::host::SandboxHost;
use crate::sandbox::message::{EvaluationRequest, InboundMessage, OutboundMessage};
use deno_core::{v8, FastString, JsRuntime, RuntimeOptions};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Script name the evaluated player code runs under
pub const SANDBOX_ENTRY_POINT: &str = "<ryt-sandbox/evaluator>";

const WORKER_THREAD_NAME: &str = "ryt-sandbox-worker";

enum SandboxCommand {
    Evaluate(EvaluationRequest),
    Shutdown,
}

/// The evaluation currently executing on the worker
struct RunningEvaluation {
    message_id: String,
    cancel: oneshot::Sender<()>,
}

/// State shared between the host and its worker for interrupting scripts
#[derive(Default)]
struct Interrupt {
    isolate: Option<v8::IsolateHandle>,
    running: Option<RunningEvaluation>,
}

type SharedInterrupt = Arc<Mutex<Interrupt>>;

fn lock_interrupt(interrupt: &SharedInterrupt) -> MutexGuard<'_, Interrupt> {
    interrupt
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Worker {
    commands: mpsc::UnboundedSender<SandboxCommand>,
    interrupt: SharedInterrupt,
}

impl Worker {
    fn is_alive(&self) -> bool {
        !self.commands.is_closed()
    }

    fn spawn(
        outbound: mpsc::UnboundedSender<InboundMessage>,
    ) -> Result<(Self, oneshot::Receiver<Result<(), String>>), SandboxError> {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let interrupt = SharedInterrupt::default();
        let worker_interrupt = interrupt.clone();

        std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(command_rx, outbound, worker_interrupt, ready_tx))
            .map_err(|e| {
                SandboxError::ContextCreation(format!("Failed to spawn sandbox thread: {}", e))
            })?;

        Ok((
            Self {
                commands,
                interrupt,
            },
            ready_rx,
        ))
    }

    /// Interrupt `message_id` if it is the evaluation currently running
    fn cancel(&self, message_id: &str) -> bool {
        let mut interrupt = lock_interrupt(&self.interrupt);
        let matches = interrupt
            .running
            .as_ref()
            .is_some_and(|running| running.message_id == message_id);
        if !matches {
            return false;
        }

        if let Some(running) = interrupt.running.take() {
            let _ = running.cancel.send(());
        }
        if let Some(isolate) = &interrupt.isolate {
            isolate.terminate_execution();
        }
        true
    }
}

/// Sandbox host running scripts in an embedded JavaScript engine
pub struct DenoSandboxHost {
    worker: Mutex<Option<Worker>>,
    outbound: mpsc::UnboundedSender<InboundMessage>,
}

impl DenoSandboxHost {
    /// Create a host and the receiver its results are delivered on
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<InboundMessage>) {
        let (outbound, inbound) = mpsc::unbounded_channel();
        let host = Arc::new(Self {
            worker: Mutex::new(None),
            outbound,
        });
        (host, inbound)
    }

    /// Stop the worker; the next `ensure_ready` creates a fresh context
    pub fn shutdown(&self) {
        if let Some(worker) = self.worker().take() {
            info!("Shutting down sandbox context");
            let _ = worker.commands.send(SandboxCommand::Shutdown);
        }
    }

    fn worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for DenoSandboxHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[async_trait::async_trait]
impl SandboxHost for DenoSandboxHost {
    async fn has_context(&self) -> Result<bool, SandboxError> {
        Ok(self.worker().as_ref().is_some_and(Worker::is_alive))
    }

    async fn create_context(&self) -> Result<(), SandboxError> {
        let ready = {
            let mut worker = self.worker();
            if worker.as_ref().is_some_and(Worker::is_alive) {
                return Err(SandboxError::ContextExists);
            }
            let (spawned, ready) = Worker::spawn(self.outbound.clone())?;
            *worker = Some(spawned);
            ready
        };

        let outcome = match ready.await {
            Ok(outcome) => outcome,
            Err(_) => Err("Sandbox thread exited during startup".to_string()),
        };

        if let Err(message) = outcome {
            self.worker().take();
            return Err(SandboxError::ContextCreation(message));
        }

        debug!("Sandbox context ready");
        Ok(())
    }

    fn post(&self, message: OutboundMessage) -> Result<(), SandboxError> {
        let worker = self.worker();
        let worker = worker
            .as_ref()
            .ok_or_else(|| SandboxError::Dispatch("No sandbox context".to_string()))?;

        worker
            .commands
            .send(SandboxCommand::Evaluate(message.data))
            .map_err(|_| SandboxError::Dispatch("Sandbox context has stopped".to_string()))
    }

    fn cancel(&self, message_id: &str) {
        let interrupted = self
            .worker()
            .as_ref()
            .is_some_and(|worker| worker.cancel(message_id));
        if interrupted {
            warn!(id = %message_id, "Interrupted running script");
        }
    }
}

fn run_worker(
    mut commands: mpsc::UnboundedReceiver<SandboxCommand>,
    outbound: mpsc::UnboundedSender<InboundMessage>,
    interrupt: SharedInterrupt,
    ready: oneshot::Sender<Result<(), String>>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let _ = ready.send(Err(format!("Failed to build sandbox runtime: {}", e)));
            return;
        }
    };

    runtime.block_on(async move {
        let mut js = JsRuntime::new(RuntimeOptions::default());
        let isolate = js.v8_isolate().thread_safe_handle();
        lock_interrupt(&interrupt).isolate = Some(isolate.clone());
        let _ = ready.send(Ok(()));

        while let Some(command) = commands.recv().await {
            let request = match command {
                SandboxCommand::Evaluate(request) => request,
                SandboxCommand::Shutdown => break,
            };

            let (cancel_tx, cancel_rx) = oneshot::channel();
            lock_interrupt(&interrupt).running = Some(RunningEvaluation {
                message_id: request.message_id.clone(),
                cancel: cancel_tx,
            });

            let outcome = tokio::select! {
                outcome = evaluate_request(&mut js, &request) => outcome,
                _ = cancel_rx => Err(SandboxError::Evaluation("Evaluation cancelled".to_string())),
            };

            // A missing entry means the host interrupted this evaluation
            if lock_interrupt(&interrupt).running.take().is_none() {
                isolate.cancel_terminate_execution();
            }

            let result = match outcome {
                Ok(result) => result,
                Err(error) => {
                    warn!(id = %request.message_id, error = %error, "Script evaluation failed");
                    None
                }
            };

            if outbound
                .send(InboundMessage::result(request.message_id, result))
                .is_err()
            {
                debug!("Result receiver dropped, stopping sandbox worker");
                break;
            }
        }
    });
}

/// Bind the argument as a global, run the script, and read its completion value
async fn evaluate_request(
    js: &mut JsRuntime,
    request: &EvaluationRequest,
) -> Result<Option<String>, SandboxError> {
    let binding = format!(
        "globalThis[{}] = {};",
        serde_json::to_string(&request.argument_name)?,
        serde_json::to_string(&request.argument_value)?
    );
    js.execute_script("<ryt-sandbox/binding>", FastString::from(binding))
        .map_err(|e| SandboxError::Evaluation(format!("Argument binding failed: {:?}", e)))?;

    let value = js
        .execute_script(SANDBOX_ENTRY_POINT, FastString::from(request.script.clone()))
        .map_err(|e| SandboxError::Evaluation(format!("{:?}", e)))?;
    let value = js
        .resolve(value)
        .await
        .map_err(|e| SandboxError::Evaluation(format!("Result resolution failed: {:?}", e)))?;

    let scope = &mut js.handle_scope();
    let local_value = value.open(scope);
    if local_value.is_null_or_undefined() {
        return Ok(None);
    }
    Ok(Some(local_value.to_rust_string_lossy(scope)))
}
