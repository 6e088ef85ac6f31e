use async_trait::async_trait;
use reportgate_core::{MetricMap, ReportLayout, SourceItem};

use crate::error::SourceError;
use crate::pagination::{Page, PageRequest};

/// A remote system shaped as {status probe, paged list, per-item detail}.
///
/// Each concrete report (SonarQube projects, Azure DevOps projects) is one
/// implementation; the pipeline only ever sees this trait.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Human-readable identity printed in the report header, usually the base URL.
    fn identity(&self) -> &str;

    /// Title and metric columns of the report this source feeds.
    fn layout(&self) -> ReportLayout;

    /// Liveness / identity check run once before listing.
    ///
    /// Implementations return [`SourceError::Authentication`] when the source
    /// does not report a healthy, authenticated session.
    async fn probe(&self) -> Result<(), SourceError>;

    /// Fetches one listing page, in server order.
    async fn fetch_page(&self, page: PageRequest) -> Result<Page, SourceError>;

    /// Fetches the detail metrics for one item, keyed by column key.
    ///
    /// Metrics the source legitimately lacks should be
    /// [`reportgate_core::MetricValue::Absent`] or simply omitted.
    async fn fetch_detail(&self, item: &SourceItem) -> Result<MetricMap, SourceError>;
}
