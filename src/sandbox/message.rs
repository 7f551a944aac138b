//! Messages exchanged with the isolated execution context

use serde::{Deserialize, Serialize};

/// Receiver named in a message envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageTarget {
    /// The isolated context that evaluates scripts
    Offscreen,
    /// The caller side awaiting results
    Background,
}

/// Request to evaluate `script` with one bound argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub script: String,
    pub argument_name: String,
    pub argument_value: String,
    pub message_id: String,
}

/// Result of one evaluation; `result` is absent when the script failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResponse {
    pub message_id: String,
    #[serde(default)]
    pub result: Option<String>,
}

/// Envelope sent to the isolated context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub target: MessageTarget,
    pub data: EvaluationRequest,
}

impl OutboundMessage {
    pub fn new(data: EvaluationRequest) -> Self {
        Self {
            target: MessageTarget::Offscreen,
            data,
        }
    }
}

/// Envelope received from the isolated context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub target: MessageTarget,
    pub data: EvaluationResponse,
}

impl InboundMessage {
    /// Build a response addressed to the caller side
    pub fn result(message_id: impl Into<String>, result: Option<String>) -> Self {
        Self {
            target: MessageTarget::Background,
            data: EvaluationResponse {
                message_id: message_id.into(),
                result,
            },
        }
    }

    /// True when the message is addressed to the caller side
    pub fn is_for_background(&self) -> bool {
        self.target == MessageTarget::Background
    }
}
