//! # ryt-sandbox - sandboxed player script evaluation
//!
//! Resolves playable media format URLs by running the player's signature
//! decipher and n-transform scripts inside an isolated JavaScript context.
//!
//! ## Features
//!
//! - Single lazily created isolated context, shared by concurrent callers
//! - Correlated request/response messaging with per-call timeouts
//! - Signature decipher and n-parameter transform of format URLs
//! - Detection of silently failing n-transform results
//! - Evaluation result caching
//!
//! ## Example
//!
//! ```rust,no_run
//! use ryt_sandbox::{DenoSandboxHost, FormatUrlTransformer, MediaFormat, ScriptEvaluationClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (host, inbound) = DenoSandboxHost::new();
//!     let client = Arc::new(ScriptEvaluationClient::new(host));
//!     client.listen(inbound);
//!
//!     let transformer = FormatUrlTransformer::new(client);
//!     let mut format = MediaFormat::with_url(18, "https://example.com/videoplayback?n=abc");
//!     transformer
//!         .transform(Some(&mut format), None, Some("ncode.split('').reverse().join('')"))
//!         .await;
//!
//!     println!("{:?}", format.url);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod error;
pub mod platform;
pub mod sandbox;
pub mod utils;

// Re-export main types
pub use core::{Catalog, MediaFormat, RetryConfig, SandboxConfig, StreamingData};
pub use error::SandboxError;
pub use platform::{FormatUrlTransformer, NTransformVerdict, PlayerScripts, TransformProgress};
pub use sandbox::{
    CallCorrelator, DenoSandboxHost, IsolatedContextManager, SandboxHost, ScriptEvaluationClient,
    ScriptEvaluator,
};

/// Result type alias for ryt-sandbox operations
pub type Result<T> = std::result::Result<T, SandboxError>;
