//! Awaitable script evaluation inside the isolated context

use crate::core::config::SandboxConfig;
use crate::error::SandboxError;
use crate::sandbox::context::{ContextPhase, IsolatedContextManager};
use crate::sandbox::correlator::CallCorrelator;
use crate::sandbox::host::SandboxHost;
use crate::sandbox::message::{EvaluationRequest, InboundMessage, OutboundMessage};
use crate::utils::cache::{EvaluationCache, EvaluationKey};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Evaluates a script with one bound argument and returns its string result
///
/// `Ok(None)` means the sandbox answered without a value (the script failed
/// or produced nothing).
#[async_trait::async_trait]
pub trait ScriptEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        script: &str,
        argument_name: &str,
        argument_value: &str,
    ) -> Result<Option<String>, SandboxError>;
}

/// Sandbox client: context assurance plus correlated dispatch
pub struct ScriptEvaluationClient {
    host: Arc<dyn SandboxHost>,
    context: IsolatedContextManager,
    correlator: CallCorrelator,
    cache: Option<EvaluationCache>,
    config: SandboxConfig,
}

impl ScriptEvaluationClient {
    /// Create a client with default configuration
    pub fn new(host: Arc<dyn SandboxHost>) -> Self {
        Self::with_config(host, SandboxConfig::default())
    }

    /// Create a client with configuration
    pub fn with_config(host: Arc<dyn SandboxHost>, config: SandboxConfig) -> Self {
        let cache = match config.cache_ttl {
            Some(ttl) if config.cache_enabled() => {
                Some(EvaluationCache::new(ttl, config.cache_capacity))
            }
            _ => None,
        };

        Self {
            context: IsolatedContextManager::new(host.clone(), config.creation_retry.clone()),
            correlator: CallCorrelator::new(host.clone()),
            host,
            cache,
            config,
        }
    }

    /// Create the isolated context ahead of the first evaluation
    pub async fn prepare(&self) -> Result<(), SandboxError> {
        self.context.ensure_ready().await
    }

    /// Evaluate `script` with `argument_name` bound to `argument_value`
    pub async fn evaluate(
        &self,
        script: &str,
        argument_name: &str,
        argument_value: &str,
    ) -> Result<Option<String>, SandboxError> {
        let key = EvaluationKey::new(script, argument_name, argument_value);
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&key).await {
                debug!(argument = argument_name, "Evaluation cache hit");
                return Ok(Some(cached));
            }
        }

        self.context.ensure_ready().await?;

        let id = Uuid::new_v4().to_string();
        let call = self.correlator.register(id.clone())?;
        debug!(id = %id, argument = argument_name, "Dispatching evaluation");

        self.correlator.dispatch(OutboundMessage::new(EvaluationRequest {
            script: script.to_string(),
            argument_name: argument_name.to_string(),
            argument_value: argument_value.to_string(),
            message_id: id.clone(),
        }))?;

        let result = match call.wait(self.config.evaluation_timeout).await {
            Ok(result) => result,
            Err(e @ SandboxError::EvaluationTimeout { .. }) => {
                // frees the context for evaluations queued behind this one
                self.host.cancel(&id);
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        if let (Some(cache), Some(value)) = (&self.cache, &result) {
            cache.insert(key, value.clone()).await;
        }
        Ok(result)
    }

    /// Route a message coming back from the isolated context
    ///
    /// Returns true when it resolved a pending evaluation.
    pub fn handle_inbound(&self, message: InboundMessage) -> bool {
        self.correlator.on_inbound_message(message)
    }

    /// Drain `inbound` into this client until the channel closes
    pub fn listen(
        self: &Arc<Self>,
        mut inbound: mpsc::UnboundedReceiver<InboundMessage>,
    ) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                client.handle_inbound(message);
            }
            info!("Sandbox inbound channel closed");
        })
    }

    /// Fail every in-flight evaluation with `CallAbandoned`
    pub fn abandon_pending(&self) -> usize {
        self.correlator.abandon_all()
    }

    /// Number of evaluations awaiting a result
    pub fn pending_calls(&self) -> usize {
        self.correlator.pending_count()
    }

    /// Current phase of the isolated context
    pub async fn context_phase(&self) -> ContextPhase {
        self.context.phase().await
    }
}

#[async_trait::async_trait]
impl ScriptEvaluator for ScriptEvaluationClient {
    async fn evaluate(
        &self,
        script: &str,
        argument_name: &str,
        argument_value: &str,
    ) -> Result<Option<String>, SandboxError> {
        ScriptEvaluationClient::evaluate(self, script, argument_name, argument_value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::retry::RetryConfig;
    use crate::sandbox::test_fixtures::{spawn_responder, ScriptedHost};
    use std::time::Duration;

    fn config() -> SandboxConfig {
        SandboxConfig::default()
            .with_creation_retry(RetryConfig::none())
            .with_evaluation_timeout(Some(Duration::from_secs(5)))
            .without_cache()
    }

    #[tokio::test]
    async fn test_evaluate_roundtrip() {
        let (host, posted) = ScriptedHost::new();
        let client = Arc::new(ScriptEvaluationClient::with_config(host.clone(), config()));
        let _responder = spawn_responder(client.clone(), posted, |request| {
            Some(request.argument_value.chars().rev().collect())
        });

        let result = client.evaluate("reverse", "sig", "abc123").await.unwrap();
        assert_eq!(result, Some("321cba".to_string()));
        assert_eq!(client.pending_calls(), 0);
        assert_eq!(client.context_phase().await, ContextPhase::Ready);
        assert_eq!(host.creations(), 1);
    }

    #[tokio::test]
    async fn test_absent_result_is_passed_through() {
        let (host, posted) = ScriptedHost::new();
        let client = Arc::new(ScriptEvaluationClient::with_config(host, config()));
        let _responder = spawn_responder(client.clone(), posted, |_| None);

        assert_eq!(client.evaluate("broken", "ncode", "n").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_results_reach_their_callers() {
        let (host, mut posted) = ScriptedHost::with_creation_delay(Duration::from_millis(20));
        let client = Arc::new(ScriptEvaluationClient::with_config(host.clone(), config()));
        const CALLS: usize = 12;

        let callers: Vec<_> = (0..CALLS)
            .map(|i| {
                let client = client.clone();
                tokio::spawn(async move {
                    let value = format!("value-{}", i);
                    let result = client.evaluate("echo", "ncode", &value).await;
                    (value, result)
                })
            })
            .collect();

        let mut requests = Vec::new();
        while requests.len() < CALLS {
            requests.push(posted.recv().await.unwrap());
        }
        for message in requests.into_iter().rev() {
            let answer = format!("{}-done", message.data.argument_value);
            assert!(client.handle_inbound(InboundMessage::result(
                message.data.message_id,
                Some(answer)
            )));
        }

        for caller in futures::future::join_all(callers).await {
            let (value, result) = caller.unwrap();
            assert_eq!(result.unwrap(), Some(format!("{}-done", value)));
        }
        assert_eq!(host.creations(), 1);
        assert_eq!(client.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_timeout_discards_pending_call() {
        let (host, _posted) = ScriptedHost::new();
        let client = ScriptEvaluationClient::with_config(
            host.clone(),
            config().with_evaluation_timeout(Some(Duration::from_millis(20))),
        );

        let err = client.evaluate("silent", "ncode", "n").await.unwrap_err();
        let SandboxError::EvaluationTimeout { id, .. } = err else {
            panic!("expected timeout, got {:?}", err);
        };
        assert_eq!(client.pending_calls(), 0);
        assert_eq!(host.cancelled(), vec![id]);
    }

    #[tokio::test]
    async fn test_context_failure_propagates() {
        let (host, _posted) = ScriptedHost::new();
        host.fail_next_creations(1);
        let client = ScriptEvaluationClient::with_config(host.clone(), config());

        let err = client.evaluate("s", "sig", "x").await.unwrap_err();
        assert!(matches!(err, SandboxError::ContextCreation(_)));
        assert_eq!(client.pending_calls(), 0);
        assert_eq!(client.context_phase().await, ContextPhase::Absent);
    }

    #[tokio::test]
    async fn test_dispatch_failure_propagates() {
        let (host, _posted) = ScriptedHost::new();
        host.reject_posts(true);
        let client = ScriptEvaluationClient::with_config(host, config());

        let err = client.evaluate("s", "sig", "x").await.unwrap_err();
        assert!(matches!(err, SandboxError::Dispatch(_)));
        assert_eq!(client.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_cached_results_skip_the_sandbox() {
        let (host, posted) = ScriptedHost::new();
        let client = Arc::new(ScriptEvaluationClient::with_config(
            host.clone(),
            config().with_cache_ttl(Some(Duration::from_secs(60))),
        ));
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let _responder = spawn_responder(client.clone(), posted, move |request| {
            let _ = seen_tx.send(request.message_id.clone());
            Some("cached".to_string())
        });

        assert_eq!(client.evaluate("s", "ncode", "n").await.unwrap(), Some("cached".to_string()));
        assert_eq!(client.evaluate("s", "ncode", "n").await.unwrap(), Some("cached".to_string()));

        assert!(seen_rx.recv().await.is_some());
        assert!(seen_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_listen_pumps_inbound_messages() {
        let (host, mut posted) = ScriptedHost::new();
        let client = Arc::new(ScriptEvaluationClient::with_config(host, config()));
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let pump = client.listen(inbound_rx);

        let forwarder = tokio::spawn(async move {
            let message = posted.recv().await.unwrap();
            inbound_tx
                .send(InboundMessage::result(message.data.message_id, Some("ok".to_string())))
                .unwrap();
        });

        assert_eq!(client.evaluate("s", "sig", "v").await.unwrap(), Some("ok".to_string()));
        forwarder.await.unwrap();
        pump.await.unwrap();
    }
}
