//! Main entry point for ryt-sandbox CLI

use anyhow::Context;
use clap::Parser;
use ryt_sandbox::cli::output::{create_progress_callback, CatalogSummary, OutputFormatter};
use ryt_sandbox::cli::Args;
use ryt_sandbox::{Catalog, DenoSandboxHost, FormatUrlTransformer, PlayerScripts, ScriptEvaluationClient};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose)?;

    info!("Starting ryt-sandbox with args: {:?}", args);

    if let Err(e) = run(&args).await {
        OutputFormatter::new(args.verbosity_level()).error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

async fn run(args: &Args) -> anyhow::Result<()> {
    let start_time = Instant::now();
    let mut formatter = OutputFormatter::new(args.verbosity_level());

    let mut catalog = load_catalog(&args.catalog)?;
    let scripts = PlayerScripts::new(
        load_script(args.decipher_script.as_deref())?,
        load_script(args.n_script.as_deref())?,
    );

    if scripts.decipher.is_none() && scripts.n_transform.is_none() {
        formatter.warning("No player scripts given, only cipher URLs will be unpacked");
    }
    formatter.info(&format!("Loaded {} formats", catalog.len()));

    // Start the sandbox
    let (host, inbound) = DenoSandboxHost::new();
    let client = Arc::new(ScriptEvaluationClient::with_config(
        host.clone(),
        args.sandbox_config(),
    ));
    let listener = client.listen(inbound);

    client
        .prepare()
        .await
        .context("Failed to create the sandbox context")?;
    debug!("Sandbox context ready");

    if !args.no_progress {
        formatter.create_progress_bar(catalog.len() as u64);
    }
    let formatter = Arc::new(formatter);

    let transformer = FormatUrlTransformer::new(client.clone())
        .with_concurrency(args.concurrency)
        .with_progress(create_progress_callback(formatter.clone()));

    transformer
        .transform_all(catalog.formats_mut(), &scripts)
        .await;
    formatter.finish_progress("Done");

    host.shutdown();
    client.abandon_pending();
    listener.abort();

    write_catalog(&catalog, args.output.as_deref())?;

    for format in catalog.formats() {
        formatter.print_format(format);
    }
    let summary = CatalogSummary::from_formats(catalog.formats());
    formatter.print_summary(&summary, start_time.elapsed());

    if let Some(output) = &args.output {
        formatter.success(&format!("Catalog written to {}", output.display()));
    }

    Ok(())
}

/// Read a format catalog from JSON
fn load_catalog(path: &Path) -> anyhow::Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog {}", path.display()))
}

/// Read an optional script file; blank files count as absent
fn load_script(path: Option<&Path>) -> anyhow::Result<Option<String>> {
    let Some(path) = path else {
        return Ok(None);
    };

    let script = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    if script.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(script))
    }
}

/// Write the catalog as pretty JSON to `output` or stdout
fn write_catalog(catalog: &Catalog, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(catalog)?;
    match output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write catalog {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

/// Initialize logging
fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };

    // Environment wins over the flag
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .try_init()?;

    Ok(())
}
