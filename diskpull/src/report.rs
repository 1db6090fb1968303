//! Final-report accumulation and rendering.
//!
//! The engine owns its counters; this module only collects failure records
//! during the run and turns the final snapshot into something a human can
//! read. It is consumed exactly once, at loop termination.

use chrono::{DateTime, Local};
use colored::Colorize;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::engine::{Outcome, TraversalState};

/// How many failure records the rendered report shows before truncating.
const MAX_RENDERED_ERRORS: usize = 5;

/// One failed processing step.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub at: DateTime<Local>,
    /// The heading being processed when the failure happened, or "session".
    pub context: String,
    pub message: String,
}

/// Collects failures while the engine runs.
#[derive(Debug)]
pub struct ReportBuilder {
    started: Instant,
    started_at: DateTime<Local>,
    download_dir: Option<PathBuf>,
    failures: Vec<FailureRecord>,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            started_at: Local::now(),
            download_dir: None,
            failures: Vec::new(),
        }
    }

    /// Remember where downloads land so the report can total their size.
    pub fn with_download_dir(mut self, dir: PathBuf) -> Self {
        self.download_dir = Some(dir);
        self
    }

    pub fn record_failure(&mut self, context: &str, message: &str) {
        self.failures.push(FailureRecord {
            at: Local::now(),
            context: context.to_string(),
            message: message.to_string(),
        });
    }

    /// Snapshot the run into its final, immutable report.
    pub fn finish(self, state: TraversalState, outcome: Outcome, scroll_offset: f64) -> RunReport {
        let total_bytes = self.download_dir.as_deref().map(dir_size).unwrap_or(0);
        RunReport {
            state,
            outcome,
            failures: self.failures,
            started_at: self.started_at,
            elapsed: self.started.elapsed(),
            scroll_offset,
            total_bytes,
            download_dir: self.download_dir,
        }
    }
}

/// The read-only result of one traversal run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub state: TraversalState,
    pub outcome: Outcome,
    pub failures: Vec<FailureRecord>,
    pub started_at: DateTime<Local>,
    #[serde(skip)]
    pub elapsed: Duration,
    /// Final cumulative scroll distance in pixels.
    pub scroll_offset: f64,
    /// Bytes found under the download directory when the run ended.
    pub total_bytes: u64,
    pub download_dir: Option<PathBuf>,
}

impl RunReport {
    /// One line for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} processed, {} failed, {} skipped, {} errors in {}",
            self.state.processed,
            self.state.failed,
            self.state.skipped,
            self.failures.len(),
            format_duration(self.elapsed),
        )
    }

    /// Multi-line colored rendering for the terminal.
    pub fn render(&self) -> String {
        let rule = "=".repeat(52).cyan().to_string();
        let thin_rule = "-".repeat(52).cyan().to_string();
        let mut out = String::new();

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{:^52}", "FINAL REPORT".bold());
        let _ = writeln!(out, "{thin_rule}");
        let _ = writeln!(out, "  {:<22} {}", "Duration", format_duration(self.elapsed));
        let _ = writeln!(out, "  {:<22} {}", "Outcome", self.describe_outcome());
        let _ = writeln!(out, "  {:<22} {}", "Groups processed", self.state.processed);

        let downloads = if self.state.failed > 0 {
            format!("{} started, {} failed", self.state.processed, self.state.failed).yellow()
        } else {
            format!("{} started", self.state.processed).green()
        };
        let _ = writeln!(out, "  {:<22} {}", "Downloads", downloads);

        if self.state.skipped > 0 {
            let skipped = format!("{} (out of date range)", self.state.skipped).yellow();
            let _ = writeln!(out, "  {:<22} {}", "Skipped", skipped);
        }
        if self.total_bytes > 0 {
            let _ = writeln!(out, "  {:<22} {}", "Total size", format_bytes(self.total_bytes));
        }

        let _ = writeln!(out, "{thin_rule}");
        if self.failures.is_empty() {
            let _ = writeln!(out, "  {}", "No errors occurred".green());
        } else {
            let _ = writeln!(
                out,
                "  {}",
                format!("Errors ({}):", self.failures.len()).red()
            );
            for record in self.failures.iter().take(MAX_RENDERED_ERRORS) {
                let line = format!("- {} ({})", record.message, record.context);
                let _ = writeln!(out, "      {}", line.red());
            }
            if self.failures.len() > MAX_RENDERED_ERRORS {
                let remaining = self.failures.len() - MAX_RENDERED_ERRORS;
                let _ = writeln!(
                    out,
                    "      {}",
                    format!("... and {remaining} more errors").red()
                );
            }
        }
        let _ = writeln!(out, "{rule}");
        out
    }

    fn describe_outcome(&self) -> String {
        match &self.outcome {
            Outcome::Exhausted => "end of timeline reached".to_string(),
            Outcome::RangeStopped => "date range exhausted".to_string(),
            Outcome::FatalAbort { reason } => format!("aborted: {reason}"),
        }
    }
}

/// Total size of all files under `dir`. Unreadable entries are skipped.
fn dir_size(dir: &Path) -> u64 {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    let mut total = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            total += dir_size(&path);
        } else if let Ok(meta) = entry.metadata() {
            total += meta.len();
        }
    }
    total
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    match bytes {
        b if b >= GB => format!("{:.2} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.2} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.2} KB", b as f64 / KB as f64),
        b => format!("{b} bytes"),
    }
}

fn format_duration(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
