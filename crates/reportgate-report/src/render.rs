//! Deterministic Markdown rendering of a report.
//!
//! [`render`] is a pure function of the [`Report`] value: no clock reads, no
//! locale, no hash-map iteration. Two renders of equal reports are
//! byte-identical. The only line that depends on `generated_at` alone starts
//! with [`GENERATED_PREFIX`]; the publish gate ignores it.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, Utc};
use reportgate_core::{ColumnKind, EnrichedRecord, MetricValue, ReportLayout};

/// Prefix of the generation-timestamp line.
pub const GENERATED_PREFIX: &str = "_Generated: ";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Everything one render needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub source_identity: String,
    pub layout: ReportLayout,
    /// Records in aggregator order.
    pub rows: Vec<EnrichedRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub total_records: usize,
    /// `(column label, sum)` for every numeric column, in layout order.
    pub numeric_totals: Vec<(String, i64)>,
    /// Records whose newest timestamp falls inside the recent window.
    pub recent_count: usize,
    /// Records with at least one failed metric.
    pub failed_records: usize,
}

impl Report {
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        summarize(&self.rows, &self.layout, self.generated_at)
    }
}

/// Derives the summary statistics of `rows`.
///
/// Numeric sums skip values that do not parse as integers, including the
/// `N/A` and `Error` markers. A record is recent when its newest parseable
/// timestamp lies in `[generated_at - recent_window_days, generated_at]`;
/// timestamps after `generated_at` and those that fail to parse never count.
/// A window reaching past the earliest representable date covers everything
/// up to `generated_at`.
#[must_use]
pub fn summarize(
    rows: &[EnrichedRecord],
    layout: &ReportLayout,
    generated_at: DateTime<Utc>,
) -> ReportSummary {
    let numeric_totals = layout
        .columns_of(ColumnKind::Numeric)
        .map(|column| {
            let sum = rows
                .iter()
                .filter_map(|r| r.metric(&column.key).as_present().and_then(parse_integer))
                .fold(0i64, i64::saturating_add);
            (column.label.clone(), sum)
        })
        .collect();

    let cutoff = chrono::Duration::try_days(i64::from(layout.recent_window_days))
        .and_then(|window| generated_at.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let recent_count = rows
        .iter()
        .filter_map(|r| newest_timestamp(r, layout))
        .filter(|ts| *ts >= cutoff && *ts <= generated_at)
        .count();

    let failed_records = rows
        .iter()
        .filter(|r| r.metrics.values().any(MetricValue::is_failed))
        .count();

    ReportSummary {
        total_records: rows.len(),
        numeric_totals,
        recent_count,
        failed_records,
    }
}

/// Renders `report` as Markdown.
#[must_use]
pub fn render(report: &Report) -> String {
    let layout = &report.layout;
    let summary = report.summary();
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "# {}", escape_cell(&layout.title));
    out.push('\n');
    let _ = writeln!(
        out,
        "{GENERATED_PREFIX}{}_",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    out.push('\n');
    let _ = writeln!(out, "**Source:** {}  ", escape_cell(&report.source_identity));
    let _ = writeln!(out, "**Total items:** {}", summary.total_records);
    out.push('\n');

    if report.rows.is_empty() {
        out.push_str("_No items found._\n");
    } else {
        render_table(&mut out, report);
    }

    out.push('\n');
    out.push_str("## Summary\n\n");
    let _ = writeln!(out, "- Total items: {}", summary.total_records);
    for (label, total) in &summary.numeric_totals {
        let _ = writeln!(out, "- Total {label}: {total}");
    }
    if layout.columns_of(ColumnKind::Timestamp).next().is_some() {
        let _ = writeln!(
            out,
            "- {} in the last {} days: {}",
            layout.recent_label, layout.recent_window_days, summary.recent_count
        );
    }
    let _ = writeln!(out, "- Items with retrieval errors: {}", summary.failed_records);

    out
}

fn render_table(out: &mut String, report: &Report) {
    let layout = &report.layout;

    out.push_str("| ");
    out.push_str(&escape_cell(&layout.item_label));
    out.push_str(" | Key |");
    for column in &layout.columns {
        out.push(' ');
        out.push_str(&escape_cell(&column.label));
        out.push_str(" |");
    }
    out.push('\n');

    out.push_str("|---|---|");
    for column in &layout.columns {
        out.push_str(match column.kind {
            ColumnKind::Numeric => "---:|",
            ColumnKind::Timestamp | ColumnKind::Text => "---|",
        });
    }
    out.push('\n');

    for record in &report.rows {
        out.push_str("| ");
        out.push_str(&escape_cell(&record.item.display_name));
        out.push_str(" | ");
        out.push_str(&escape_cell(&record.item.key));
        out.push_str(" |");
        for column in &layout.columns {
            out.push(' ');
            out.push_str(&escape_cell(&format_cell(record.metric(&column.key), column.kind)));
            out.push_str(" |");
        }
        out.push('\n');
    }
}

/// Formats one metric for display. Values that fail to parse for their column
/// kind are shown verbatim.
fn format_cell(value: &MetricValue, kind: ColumnKind) -> String {
    let Some(raw) = value.as_present() else {
        return value.to_string();
    };
    match kind {
        ColumnKind::Numeric => parse_integer(raw).map_or_else(|| raw.to_owned(), |n| n.to_string()),
        ColumnKind::Timestamp => parse_timestamp(raw).map_or_else(
            || raw.to_owned(),
            |ts| ts.format(TIMESTAMP_FORMAT).to_string(),
        ),
        ColumnKind::Text => raw.to_owned(),
    }
}

fn newest_timestamp(record: &EnrichedRecord, layout: &ReportLayout) -> Option<DateTime<Utc>> {
    layout
        .columns_of(ColumnKind::Timestamp)
        .filter_map(|c| record.metric(&c.key).as_present().and_then(parse_timestamp))
        .max()
}

#[must_use]
pub fn parse_integer(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

/// Parses RFC 3339, `2025-01-20T10:11:12+0000`, or a plain `2025-01-20` date
/// (taken as midnight UTC).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Keeps cell text on one line and prevents it from splitting the table.
fn escape_cell(text: &str) -> String {
    text.replace(['\r', '\n'], " ").replace('|', "\\|")
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
