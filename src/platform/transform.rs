//! Signature decipher and n-transform applied to media format URLs

use crate::core::format::MediaFormat;
use crate::error::SandboxError;
use crate::platform::heuristics::classify_n_result;
use crate::sandbox::client::ScriptEvaluator;
use crate::utils::url::{get_query_param, parse_cipher, set_query_param};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};
use url::Url;

/// Argument name the decipher script reads the scrambled signature from
pub const DECIPHER_ARGUMENT: &str = "sig";

/// Argument name the n-transform script reads `n` from
pub const N_ARGUMENT: &str = "ncode";

/// Query parameter used for the signature when the cipher names none
pub const DEFAULT_SIGNATURE_PARAM: &str = "sig";

/// Query parameter rewritten by the n-transform
pub const N_PARAM: &str = "n";

/// Default number of formats transformed at once
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Decipher and n-transform scripts extracted from the player; either may be absent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerScripts {
    pub decipher: Option<String>,
    pub n_transform: Option<String>,
}

impl PlayerScripts {
    pub fn new(decipher: Option<String>, n_transform: Option<String>) -> Self {
        Self {
            decipher,
            n_transform,
        }
    }
}

/// Catalog progress reported after each format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformProgress {
    pub completed: usize,
    pub total: usize,
}

pub type ProgressCallback = Arc<dyn Fn(TransformProgress) + Send + Sync>;

/// Rewrites format URLs through the sandboxed player scripts
pub struct FormatUrlTransformer {
    evaluator: Arc<dyn ScriptEvaluator>,
    concurrency: usize,
    progress: Option<ProgressCallback>,
}

impl FormatUrlTransformer {
    /// Create a transformer evaluating scripts through `evaluator`
    pub fn new(evaluator: Arc<dyn ScriptEvaluator>) -> Self {
        Self {
            evaluator,
            concurrency: DEFAULT_CONCURRENCY,
            progress: None,
        }
    }

    /// Set how many formats of a catalog are transformed at once
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set a callback invoked after each format of a catalog
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(TransformProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Resolve the download URL of one format in place
    ///
    /// Never fails: errors are logged and leave the format as it was.
    pub async fn transform(
        &self,
        format: Option<&mut MediaFormat>,
        decipher_script: Option<&str>,
        n_transform_script: Option<&str>,
    ) {
        let Some(format) = format else {
            return;
        };

        let ciphered = format.is_ciphered();
        let Some(raw_url) = format.raw_url().map(str::to_string) else {
            debug!(itag = format.itag, "Format has no url or cipher, skipping");
            return;
        };

        match self
            .resolve_url(raw_url, ciphered, decipher_script, n_transform_script)
            .await
        {
            Ok(url) => {
                format.url = Some(url);
                format.clear_cipher();
            }
            Err(e) => {
                error!(itag = format.itag, error = %e, "Error setting download URL");
            }
        }
    }

    /// Transform every format; one failure never affects the others
    pub async fn transform_all<'a, I>(&self, formats: I, scripts: &PlayerScripts)
    where
        I: IntoIterator<Item = &'a mut MediaFormat>,
    {
        let formats: Vec<&mut MediaFormat> = formats.into_iter().collect();
        let total = formats.len();
        let completed = AtomicUsize::new(0);
        let decipher = scripts.decipher.as_deref();
        let n_transform = scripts.n_transform.as_deref();

        stream::iter(formats)
            .for_each_concurrent(self.concurrency, |format| {
                let completed = &completed;
                async move {
                    self.transform(Some(format), decipher, n_transform).await;
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(progress) = &self.progress {
                        progress(TransformProgress {
                            completed: done,
                            total,
                        });
                    }
                }
            })
            .await;
    }

    async fn resolve_url(
        &self,
        raw_url: String,
        ciphered: bool,
        decipher_script: Option<&str>,
        n_transform_script: Option<&str>,
    ) -> Result<String, SandboxError> {
        let url = if ciphered {
            self.decipher(&raw_url, decipher_script).await?
        } else {
            raw_url
        };
        self.n_transform(url, n_transform_script).await
    }

    /// Recover the embedded URL from a cipher and attach the deciphered signature
    async fn decipher(&self, cipher: &str, script: Option<&str>) -> Result<String, SandboxError> {
        let params = parse_cipher(cipher);
        let embedded = params.url.ok_or_else(|| {
            SandboxError::MalformedResponse("Signature cipher carries no url".to_string())
        })?;

        let (signature, script) = match (params.signature.filter(|s| !s.is_empty()), script) {
            (Some(signature), Some(script)) => (signature, script),
            _ => return Ok(embedded),
        };

        let mut url = Url::parse(&embedded)?;
        let deciphered = self
            .evaluator
            .evaluate(script, DECIPHER_ARGUMENT, &signature)
            .await?
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                SandboxError::MalformedResponse(
                    "Decipher function returned no signature".to_string(),
                )
            })?;

        let param = params
            .signature_param
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_SIGNATURE_PARAM.to_string());
        set_query_param(&mut url, &param, &deciphered);
        Ok(url.to_string())
    }

    /// Replace the `n` query parameter with its transformed value
    async fn n_transform(&self, url: String, script: Option<&str>) -> Result<String, SandboxError> {
        let mut parsed = Url::parse(&url)?;
        let n = get_query_param(&parsed, N_PARAM).filter(|n| !n.is_empty());

        let (n, script) = match (n, script) {
            (Some(n), Some(script)) => (n, script),
            _ => return Ok(url),
        };

        let transformed = self.evaluator.evaluate(script, N_ARGUMENT, &n).await?;
        let verdict = classify_n_result(&n, transformed.as_deref());
        if let Some(message) = verdict.warning() {
            warn!(n = %n, verdict = ?verdict, "{}", message);
        }

        if let (true, Some(value)) = (verdict.applies(), transformed) {
            set_query_param(&mut parsed, N_PARAM, &value);
        }
        Ok(parsed.to_string())
    }
}
