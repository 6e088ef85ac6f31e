//! Column layout of a rendered report.

use serde::{Deserialize, Serialize};

/// How the renderer interprets a metric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Integer-like values; summed in the report summary.
    Numeric,
    /// Dates or date-times; the most recent one per row feeds the recent count.
    Timestamp,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricColumn {
    /// Metric name as produced by the detail fetch.
    pub key: String,
    /// Table header text.
    pub label: String,
    pub kind: ColumnKind,
}

impl MetricColumn {
    #[must_use]
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLayout {
    pub title: String,
    /// Header for the item name column.
    pub item_label: String,
    pub columns: Vec<MetricColumn>,
    /// Label used in the summary for the recent count, e.g. "Analysed".
    pub recent_label: String,
    pub recent_window_days: u32,
}

impl ReportLayout {
    #[must_use]
    pub fn new(title: impl Into<String>, item_label: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            item_label: item_label.into(),
            columns: Vec::new(),
            recent_label: "Updated".to_string(),
            recent_window_days: 30,
        }
    }

    #[must_use]
    pub fn column(mut self, key: &str, label: &str, kind: ColumnKind) -> Self {
        self.columns.push(MetricColumn::new(key, label, kind));
        self
    }

    #[must_use]
    pub fn recent_label(mut self, label: impl Into<String>) -> Self {
        self.recent_label = label.into();
        self
    }

    #[must_use]
    pub fn recent_window_days(mut self, days: u32) -> Self {
        self.recent_window_days = days;
        self
    }

    pub fn columns_of(&self, kind: ColumnKind) -> impl Iterator<Item = &MetricColumn> {
        self.columns.iter().filter(move |c| c.kind == kind)
    }
}
