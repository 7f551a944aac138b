//! Error types for ryt-sandbox

use std::time::Duration;
use thiserror::Error;

/// Main error type for sandbox and transform operations
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Sandbox context creation failed: {0}")]
    ContextCreation(String),

    #[error("Sandbox context already exists")]
    ContextExists,

    #[error("Failed to dispatch evaluation request: {0}")]
    Dispatch(String),

    #[error("Evaluation {id} timed out after {timeout:?}")]
    EvaluationTimeout { id: String, timeout: Duration },

    #[error("Duplicate correlation identifier: {0}")]
    DuplicateIdentifier(String),

    #[error("Evaluation {0} was abandoned before a result arrived")]
    CallAbandoned(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Script evaluation error: {0}")]
    Evaluation(String),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl SandboxError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SandboxError::ContextCreation(_) | SandboxError::EvaluationTimeout { .. }
        )
    }

    /// Check if error comes from the sandbox lifecycle or transport rather than
    /// from the content of a response
    pub fn is_context_error(&self) -> bool {
        matches!(
            self,
            SandboxError::ContextCreation(_)
                | SandboxError::ContextExists
                | SandboxError::Dispatch(_)
                | SandboxError::EvaluationTimeout { .. }
                | SandboxError::CallAbandoned(_)
        )
    }
}
