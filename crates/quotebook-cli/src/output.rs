//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::Local;
use quotebook_core::sync::{CycleReport, SyncOutcome, SyncSummary};
use quotebook_core::{CategoryFilter, ImportReport, Quote};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single quote
    pub fn print_quote(&self, quote: &Quote) {
        match self.format {
            OutputFormat::Human => {
                println!("\"{}\"", quote.text);
                println!("    - {} (#{})", quote.category, quote.id);
            }
            OutputFormat::Json => print_json(quote),
            OutputFormat::Quiet => println!("{}", quote.text),
        }
    }

    /// Print a list of quotes
    pub fn print_quotes(&self, quotes: &[Quote], filter: &CategoryFilter) {
        match self.format {
            OutputFormat::Human => {
                if quotes.is_empty() {
                    if filter.is_all() {
                        println!("No quotes found.");
                    } else {
                        println!("No quotes in category '{}'.", filter);
                    }
                    return;
                }
                for quote in quotes {
                    println!(
                        "{:>14} | {:<14} | {}",
                        quote.id,
                        truncate(&quote.category, 14),
                        truncate(&quote.text, 60)
                    );
                }
                println!("\n{} quote(s), filter: {}", quotes.len(), filter);
            }
            OutputFormat::Json => print_json(&quotes),
            OutputFormat::Quiet => {
                for quote in quotes {
                    println!("{}", quote.id);
                }
            }
        }
    }

    /// Print categories with counts, marking the active filter
    pub fn print_categories(&self, counts: &[(String, usize)], current: &CategoryFilter) {
        match self.format {
            OutputFormat::Human => {
                let total: usize = counts.iter().map(|(_, count)| count).sum();
                let marker = |selected: bool| if selected { "*" } else { " " };

                println!("{} all ({})", marker(current.is_all()), total);
                for (name, count) in counts {
                    let selected = matches!(current, CategoryFilter::Category(c) if c == name);
                    println!("{} {} ({})", marker(selected), name, count);
                }
            }
            OutputFormat::Json => {
                let categories: Vec<_> = counts
                    .iter()
                    .map(|(name, count)| serde_json::json!({"name": name, "count": count}))
                    .collect();
                print_json(&serde_json::json!({
                    "current": current.to_string(),
                    "categories": categories,
                }));
            }
            OutputFormat::Quiet => {
                for (name, _) in counts {
                    println!("{}", name);
                }
            }
        }
    }

    /// Print the result of an import
    pub fn print_import_report(&self, report: &ImportReport) {
        match self.format {
            OutputFormat::Human => {
                println!("✓ Imported {} quote(s)", report.imported.len());
                if report.skipped > 0 {
                    println!("  Skipped {} malformed entr(ies)", report.skipped);
                }
            }
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => {}
        }
    }

    /// Print the summary of a completed sync
    pub fn print_sync_summary(&self, summary: &SyncSummary) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", summary.notification()),
            OutputFormat::Json => print_json(&serde_json::json!({
                "status": "success",
                "conflicts_resolved": summary.conflicts_resolved,
                "new_records": summary.new_records,
                "unchanged": summary.unchanged,
                "clean": summary.is_clean(),
            })),
            OutputFormat::Quiet => {}
        }
    }

    /// Print one report from scheduled sync
    pub fn print_cycle_report(&self, report: &CycleReport) {
        let at = report.finished_at.with_timezone(&Local).format("%H:%M:%S");
        match (&report.result, self.format) {
            (Ok(SyncOutcome::Completed(summary)), OutputFormat::Human) => {
                println!("[{}] {}", at, summary.notification());
            }
            (Ok(SyncOutcome::Completed(summary)), OutputFormat::Json) => {
                print_json(&serde_json::json!({
                    "at": report.finished_at.to_rfc3339(),
                    "status": "success",
                    "conflicts_resolved": summary.conflicts_resolved,
                    "new_records": summary.new_records,
                }));
            }
            (Ok(SyncOutcome::Skipped), _) => {}
            (Err(e), OutputFormat::Human) => eprintln!("[{}] {}", at, sync_failure_line(e)),
            (Err(e), OutputFormat::Json) => print_json(&serde_json::json!({
                "at": report.finished_at.to_rfc3339(),
                "status": "error",
                "message": e.to_string(),
            })),
            (_, OutputFormat::Quiet) => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Plain-text line for a failed sync, shared by one-off and scheduled runs
pub fn sync_failure_line(error: &dyn std::fmt::Display) -> String {
    format!("Sync failed: {}", error)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
