//! End-of-run report formatting.
//!
//! # Output Format
//!
//! ```text
//! Verified media/ (raster image, HDR image)
//!     OK            3
//!     RASTER_ERROR  1
//!     HDR_ERROR     0
//!     MOVIE_ERROR   0
//!     NOT_FOUND     0
//!     TIMEOUT       0
//!     OTHER_ERROR   0
//!     EMPTY         0
//! Checked 4 files, 1 failed
//! ```
//!
//! Every label is listed, zeros included, in taxonomy order so reports from
//! different runs line up. `--json` emits the same [`ScanSummary`] through
//! `serde_json`.
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>` or `String`)
//! for testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::dispatch::ScanSummary;
use crate::stats::Outcome;

const INDENT: &str = "    ";

fn label_width() -> usize {
    Outcome::ALL.iter().map(|o| o.label().len()).max().unwrap_or(0)
}

fn plural(n: u64, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Format the human-readable report.
pub fn format_report(summary: &ScanSummary) -> Vec<String> {
    let categories = summary
        .categories
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let mut lines = vec![format!(
        "Verified {} ({categories})",
        summary.root.display()
    )];

    let width = label_width();
    for outcome in Outcome::ALL {
        lines.push(format!(
            "{INDENT}{:<width$}  {}",
            outcome.label(),
            summary.counts.get(outcome)
        ));
    }

    lines.push(format!(
        "Checked {}, {} failed",
        plural(summary.files, "file"),
        summary.counts.failures()
    ));
    lines
}

pub fn print_report(summary: &ScanSummary) {
    for line in format_report(summary) {
        println!("{line}");
    }
}

/// Pretty-printed JSON form of the summary.
pub fn format_json(summary: &ScanSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}

pub fn print_json(summary: &ScanSummary) -> Result<(), serde_json::Error> {
    println!("{}", format_json(summary)?);
    Ok(())
}
