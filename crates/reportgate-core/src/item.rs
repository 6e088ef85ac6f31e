//! Records flowing through one report run.
//!
//! A [`SourceItem`] is one entry of the listed collection. Enrichment joins it
//! with per-item metrics to form an [`EnrichedRecord`]. Metric values are
//! tagged so that "the source has nothing for this item" and "we failed to ask"
//! stay distinguishable all the way to the rendered report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::layout::MetricColumn;

/// Marker rendered for [`MetricValue::Absent`].
pub const ABSENT_MARKER: &str = "N/A";
/// Marker rendered for [`MetricValue::Failed`].
pub const FAILED_MARKER: &str = "Error";

/// One unit of the listed collection (a project, in both shipped sources).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    /// Stable identifier, unique within one fetch cycle.
    pub key: String,
    pub display_name: String,
    /// `true` when the source marks the item private.
    #[serde(default)]
    pub restricted: bool,
}

impl SourceItem {
    #[must_use]
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            restricted: false,
        }
    }

    #[must_use]
    pub fn restricted(mut self, restricted: bool) -> Self {
        self.restricted = restricted;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum MetricValue {
    Present(String),
    /// Not applicable, e.g. a project that was never analysed.
    Absent,
    /// The detail fetch for this item failed.
    Failed,
}

impl MetricValue {
    #[must_use]
    pub fn present(value: impl Into<String>) -> Self {
        MetricValue::Present(value.into())
    }

    /// Maps `None` to [`MetricValue::Absent`].
    #[must_use]
    pub fn from_option(value: Option<String>) -> Self {
        value.map_or(MetricValue::Absent, MetricValue::Present)
    }

    #[must_use]
    pub fn as_present(&self) -> Option<&str> {
        match self {
            MetricValue::Present(v) => Some(v.as_str()),
            MetricValue::Absent | MetricValue::Failed => None,
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, MetricValue::Failed)
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Present(v) => f.write_str(v),
            MetricValue::Absent => f.write_str(ABSENT_MARKER),
            MetricValue::Failed => f.write_str(FAILED_MARKER),
        }
    }
}

/// Metric name to value. Ordered so iteration never depends on hashing.
pub type MetricMap = BTreeMap<String, MetricValue>;

/// A [`SourceItem`] joined with its detail metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub item: SourceItem,
    pub metrics: MetricMap,
}

impl EnrichedRecord {
    /// Builds a record holding exactly the declared `columns`.
    ///
    /// Columns the detail map does not mention become [`MetricValue::Absent`];
    /// entries outside `columns` are dropped.
    #[must_use]
    pub fn from_detail(item: SourceItem, columns: &[MetricColumn], mut detail: MetricMap) -> Self {
        let metrics = columns
            .iter()
            .map(|c| {
                let value = detail.remove(&c.key).unwrap_or(MetricValue::Absent);
                (c.key.clone(), value)
            })
            .collect();
        Self { item, metrics }
    }

    /// Builds a record whose every declared metric is [`MetricValue::Failed`].
    #[must_use]
    pub fn failed(item: SourceItem, columns: &[MetricColumn]) -> Self {
        let metrics = columns
            .iter()
            .map(|c| (c.key.clone(), MetricValue::Failed))
            .collect();
        Self { item, metrics }
    }

    /// Value for `key`, treating an unknown metric as absent.
    #[must_use]
    pub fn metric(&self, key: &str) -> &MetricValue {
        self.metrics.get(key).unwrap_or(&MetricValue::Absent)
    }
}
