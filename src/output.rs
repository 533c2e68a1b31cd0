//! Presentation text for previews, progress and notifications.
//!
//! Everything here is a pure function from core data to strings, so the
//! presentation layer only decides *where* text goes, never *what* it says.
//!
//! ```text
//! Preview tile     holiday.png · PNG · 1.5 MB
//! Result tile      holiday.webp · WEBP · 800 × 600 · 312.4 KB
//! Progress         67% Converting 2 of 3
//! Notices          [warning] Skipped 1 file that is not an image
//!                  [success] Converted 2 of 3 images
//! ```

use crate::batch::{BatchEvent, BatchSummary, ItemOutcome, ProgressEvent};
use crate::imaging::Dimensions;
use crate::registry::AddReport;
use crate::types::{ResultRecord, SourceRecord};
use std::fmt;

// ============================================================================
// Notices
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// A short, transient message (toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

// ============================================================================
// Sizes
// ============================================================================

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human-readable size in 1024 steps, at most two decimals, trailing zeros
/// dropped: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut exponent = 0;
    while exponent + 1 < SIZE_UNITS.len() && bytes >= 1u64 << (10 * (exponent + 1)) {
        exponent += 1;
    }
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", SIZE_UNITS[exponent])
}

/// `800 × 600`
pub fn format_dimensions(dimensions: Dimensions) -> String {
    format!("{} × {}", dimensions.width, dimensions.height)
}

// ============================================================================
// Tiles
// ============================================================================

pub fn format_source_tile(source: &SourceRecord) -> String {
    format!(
        "{} · {} · {}",
        source.original_name,
        source.type_label(),
        format_file_size(source.size_bytes)
    )
}

pub fn format_result_tile(result: &ResultRecord) -> String {
    format!(
        "{} · {} · {} · {}",
        result.name,
        result.format_label,
        format_dimensions(result.output_dimensions),
        format_file_size(result.size_bytes)
    )
}

// ============================================================================
// Progress
// ============================================================================

/// `Converting <index> of <total>`, with a 1-based index.
pub fn progress_label(index: usize, total: usize) -> String {
    format!("Converting {index} of {total}")
}

/// `67% Converting 2 of 3`
pub fn format_progress(event: &ProgressEvent) -> String {
    format!("{}% {}", event.percent(), event.label)
}

/// Lines for a batch event, suitable for a log pane.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => {
            vec![format!("Converting {}", plural(*total, "image", "images"))]
        }
        BatchEvent::Progress(progress) => {
            let mut lines = vec![format_progress(progress)];
            match &progress.outcome {
                ItemOutcome::Converted { .. } => lines.push(format!("    {}: done", progress.name)),
                ItemOutcome::Failed { reason } => {
                    lines.push(format!("    {}: failed", progress.name));
                    lines.push(format!("        {reason}"));
                }
            }
            lines
        }
        BatchEvent::Finished(summary) => vec![format_summary(summary).to_string()],
    }
}

// ============================================================================
// Notices
// ============================================================================

/// Notices for an upload: skipped non-images, duplicates, and the count added.
pub fn format_add_report(report: &AddReport) -> Vec<Notice> {
    if report.accepted_images() == 0 {
        return vec![Notice::new(
            Severity::Warning,
            "Please choose valid image files",
        )];
    }
    let mut notices = Vec::new();
    if report.invalid > 0 {
        notices.push(Notice::new(
            Severity::Warning,
            format!(
                "Skipped {} that {} not an image",
                plural(report.invalid, "file", "files"),
                if report.invalid == 1 { "is" } else { "are" }
            ),
        ));
    }
    if report.duplicates > 0 {
        notices.push(Notice::new(
            Severity::Info,
            format!(
                "Skipped {} already added",
                plural(report.duplicates, "file", "files")
            ),
        ));
    }
    if !report.added.is_empty() {
        notices.push(Notice::new(
            Severity::Success,
            format!(
                "Added {}",
                plural(report.added.len(), "image", "images")
            ),
        ));
    }
    notices
}

/// Final notice for a run.
pub fn format_summary(summary: &BatchSummary) -> Notice {
    if summary.total == 0 {
        return Notice::new(Severity::Info, "No images to convert");
    }
    if summary.is_total_failure() && !summary.cancelled {
        return Notice::new(Severity::Error, "No images could be converted");
    }
    let mut message = if summary.failed == 0 && !summary.cancelled {
        format!("Converted {}", plural(summary.succeeded, "image", "images"))
    } else {
        format!("Converted {} of {} images", summary.succeeded, summary.total)
    };
    if summary.failed > 0 {
        message.push_str(&format!(", {} failed", summary.failed));
    }
    if summary.cancelled {
        message.push_str(" (cancelled)");
    }
    let severity = if summary.failed > 0 || summary.cancelled {
        Severity::Warning
    } else {
        Severity::Success
    };
    Notice::new(severity, message)
}
