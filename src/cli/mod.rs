//! Command line interface for ryt-sandbox

pub mod args;
pub mod output;

pub use args::Args;
pub use output::{CatalogSummary, OutputFormatter};
