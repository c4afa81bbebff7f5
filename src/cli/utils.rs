//! Shared utilities for CLI commands

use chrono::NaiveDate;
use tabled::{Table, settings::Style};

/// Truncate a string with ellipsis if it exceeds max length
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}

/// Render a percentage as a ten-cell bar followed by the number
pub fn progress_bar(percent: u8) -> String {
    let filled = (usize::from(percent.min(100)) + 5) / 10;
    format!(
        "{}{} {}%",
        "█".repeat(filled),
        "░".repeat(10 - filled),
        percent
    )
}

/// Format a `YYYY-MM-DD` date as e.g. `10 Jan 2025`; other input is shown as-is
pub fn format_due_date(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%-d %b %Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}

/// Turn a bare search term into a substring `like` pattern; terms containing
/// `%` or `*` pass through as explicit patterns.
pub fn search_pattern(term: &str) -> String {
    if term.contains(['%', '*']) {
        term.to_string()
    } else {
        let escaped = term.replace('\\', "\\\\").replace('_', "\\_");
        format!("%{}%", escaped)
    }
}

/// Apply consistent table styling
pub fn apply_table_style(table: &mut Table) {
    table.with(Style::rounded());
}
