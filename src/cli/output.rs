//! Output formatting and progress display

use crate::cli::args::VerbosityLevel;
use crate::core::format::MediaFormat;
use crate::platform::transform::TransformProgress;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

/// Output formatter for ryt-sandbox
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
    progress_bar: Option<ProgressBar>,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            progress_bar: None,
        }
    }

    /// Create a progress bar over the formats of a catalog
    pub fn create_progress_bar(&mut self, total_formats: u64) -> Option<ProgressBar> {
        if self.verbosity == VerbosityLevel::Quiet {
            return None;
        }

        let progress_bar = ProgressBar::new(total_formats);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} formats {msg}")
        {
            progress_bar.set_style(style.progress_chars("#>-"));
        }
        progress_bar.set_message("Resolving...");

        self.progress_bar = Some(progress_bar.clone());
        Some(progress_bar)
    }

    /// Update progress bar
    pub fn update_progress(&self, progress: TransformProgress) {
        if let Some(progress_bar) = &self.progress_bar {
            progress_bar.set_length(progress.total as u64);
            progress_bar.set_position(progress.completed as u64);
        }
    }

    /// Finish progress bar
    pub fn finish_progress(&self, message: &str) {
        if let Some(progress_bar) = &self.progress_bar {
            progress_bar.finish_with_message(message.to_string());
        }
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("ℹ️  {}", message);
        }
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("✅ {}", message.green());
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("⚠️  {}", message.yellow());
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("❌ {}", message.red());
    }

    /// Print debug message
    pub fn debug(&self, message: &str) {
        if self.verbosity == VerbosityLevel::Verbose {
            eprintln!("🐛 {}", message);
        }
    }

    /// Print one format and whether its URL is usable
    pub fn print_format(&self, format: &MediaFormat) {
        if self.verbosity != VerbosityLevel::Verbose {
            return;
        }

        let status = if format.is_resolved() {
            "resolved".green()
        } else {
            "ciphered".yellow()
        };
        eprintln!(
            "  📋 itag={} | {} | {} | {}",
            format.itag,
            format.quality_label.as_deref().unwrap_or("-"),
            format.mime_type.as_deref().unwrap_or("-"),
            status
        );
    }

    /// Print catalog summary
    pub fn print_summary(&self, summary: &CatalogSummary, duration: Duration) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        eprintln!();
        eprintln!("📊 {} formats", summary.total);
        eprintln!("✅ {} resolved", summary.resolved.to_string().green());
        if summary.unresolved > 0 {
            eprintln!("⚠️  {} still ciphered", summary.unresolved.to_string().yellow());
        }
        if summary.skipped > 0 {
            eprintln!("⏭️  {} without url or cipher", summary.skipped);
        }
        eprintln!("⏱️  Time: {}", format_duration(duration));
    }
}

/// Outcome counts for a processed catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    pub total: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub skipped: usize,
}

impl CatalogSummary {
    /// Count outcomes over transformed formats
    pub fn from_formats<'a>(formats: impl IntoIterator<Item = &'a MediaFormat>) -> Self {
        let mut summary = Self::default();
        for format in formats {
            summary.total += 1;
            if format.is_resolved() {
                summary.resolved += 1;
            } else if format.raw_url().is_some() {
                summary.unresolved += 1;
            } else {
                summary.skipped += 1;
            }
        }
        summary
    }
}

/// Create a progress callback for the transformer
pub fn create_progress_callback(
    formatter: Arc<OutputFormatter>,
) -> impl Fn(TransformProgress) + Send + Sync + 'static {
    move |progress: TransformProgress| {
        formatter.update_progress(progress);
    }
}

/// Format duration as human-readable string
fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    let total_seconds = duration.as_secs();

    if total_seconds == 0 {
        format!("{}ms", millis)
    } else if total_seconds < 60 {
        format!("{}.{}s", total_seconds, duration.subsec_millis() / 100)
    } else {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        if seconds == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m {}s", minutes, seconds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_formatter_creation() {
        let formatter = OutputFormatter::new(VerbosityLevel::Normal);
        assert_eq!(formatter.verbosity, VerbosityLevel::Normal);
        assert!(formatter.progress_bar.is_none());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
    }

    #[test]
    fn test_create_progress_bar_quiet_mode() {
        let mut formatter = OutputFormatter::new(VerbosityLevel::Quiet);
        assert!(formatter.create_progress_bar(10).is_none());
    }

    #[test]
    fn test_progress_updates() {
        let mut formatter = OutputFormatter::new(VerbosityLevel::Normal);
        let progress_bar = formatter.create_progress_bar(4).unwrap();

        formatter.update_progress(TransformProgress {
            completed: 3,
            total: 4,
        });
        assert_eq!(progress_bar.position(), 3);

        // Should not panic
        formatter.finish_progress("Done");
    }

    #[test]
    fn test_create_progress_callback() {
        let formatter = Arc::new(OutputFormatter::new(VerbosityLevel::Normal));
        let callback = create_progress_callback(formatter);

        // Should not panic without a bar
        callback(TransformProgress {
            completed: 1,
            total: 2,
        });
    }

    #[test]
    fn test_catalog_summary() {
        let mut unresolved = MediaFormat::with_signature_cipher(22, "s=a&url=b");
        unresolved.url = None;
        let formats = vec![
            MediaFormat::with_url(18, "https://example/v"),
            unresolved,
            MediaFormat::default(),
        ];

        let summary = CatalogSummary::from_formats(&formats);
        assert_eq!(
            summary,
            CatalogSummary {
                total: 3,
                resolved: 1,
                unresolved: 1,
                skipped: 1,
            }
        );
    }

    #[test]
    fn test_print_in_quiet_mode() {
        let formatter = OutputFormatter::new(VerbosityLevel::Quiet);
        // Should not print anything
        formatter.info("test");
        formatter.success("test");
        formatter.warning("test");
        formatter.print_summary(&CatalogSummary::default(), Duration::from_secs(1));
    }
}
