//! Command line argument parsing

use crate::core::config::{SandboxConfig, DEFAULT_CACHE_CAPACITY};
use crate::core::retry::RetryConfig;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// RYT Sandbox - resolve media format URLs through sandboxed player scripts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Format catalog (JSON list of formats or a streamingData object)
    pub catalog: PathBuf,

    /// File containing the signature decipher script
    #[arg(short, long, value_name = "PATH")]
    pub decipher_script: Option<PathBuf>,

    /// File containing the n-transform script
    #[arg(short, long, value_name = "PATH")]
    pub n_script: Option<PathBuf>,

    /// Write the transformed catalog here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Per-evaluation timeout (e.g., 10s, 1m); 0s waits forever
    #[arg(long, value_name = "DURATION", default_value = "10s")]
    pub timeout: humantime::Duration,

    /// Retries for sandbox context creation
    #[arg(long, default_value = "2")]
    pub retries: u32,

    /// Delay before the first creation retry
    #[arg(long, value_name = "DURATION", default_value = "100ms")]
    pub retry_delay: humantime::Duration,

    /// Upper bound for the backoff between creation retries
    #[arg(long, value_name = "DURATION", default_value = "5s")]
    pub max_retry_delay: humantime::Duration,

    /// Formats transformed at once
    #[arg(long, default_value = "8")]
    pub concurrency: usize,

    /// Disable the evaluation result cache
    #[arg(long)]
    pub no_cache: bool,

    /// How long evaluation results stay cached; 0s disables the cache
    #[arg(long, value_name = "DURATION", default_value = "1h")]
    pub cache_ttl: humantime::Duration,

    /// Maximum number of cached evaluation results
    #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub cache_capacity: u64,

    /// Disable progress output
    #[arg(long)]
    pub no_progress: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Get evaluation timeout; zero means no timeout
    pub fn timeout_duration(&self) -> Option<Duration> {
        let timeout: Duration = self.timeout.into();
        if timeout.is_zero() {
            None
        } else {
            Some(timeout)
        }
    }

    /// Build the sandbox client configuration
    pub fn sandbox_config(&self) -> SandboxConfig {
        let retry = RetryConfig::default()
            .with_max_retries(self.retries)
            .with_initial_delay(self.retry_delay.into())
            .with_max_delay(self.max_retry_delay.into());
        let config = SandboxConfig::default()
            .with_evaluation_timeout(self.timeout_duration())
            .with_creation_retry(retry)
            .with_cache_ttl(Some(self.cache_ttl.into()).filter(|ttl: &Duration| !ttl.is_zero()))
            .with_cache_capacity(self.cache_capacity);
        if self.no_cache {
            config.without_cache()
        } else {
            config
        }
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}
