//! Host capabilities the sandbox client depends on

use crate::error::SandboxError;
use crate::sandbox::message::OutboundMessage;

/// Provider of the isolated execution context and its outbound channel
///
/// Responses travel back separately as [`InboundMessage`](crate::sandbox::InboundMessage)
/// values and are fed to [`ScriptEvaluationClient::handle_inbound`](crate::sandbox::ScriptEvaluationClient::handle_inbound).
#[async_trait::async_trait]
pub trait SandboxHost: Send + Sync {
    /// Whether a context serving this subsystem's entry point already exists
    async fn has_context(&self) -> Result<bool, SandboxError>;

    /// Create the context. Hosts may reject a second live context.
    async fn create_context(&self) -> Result<(), SandboxError>;

    /// Send a message to the context without waiting for delivery
    fn post(&self, message: OutboundMessage) -> Result<(), SandboxError>;

    /// Stop work on an evaluation whose caller gave up
    ///
    /// Hosts that cannot interrupt a running script may ignore this.
    fn cancel(&self, _message_id: &str) {}
}
