//! One report run: fetch → enrich → render → decide → publish.
//!
//! Phases advance `Idle → Fetching → Enriching → Rendering → Deciding →
//! {Publishing | Skipped} → Done`. Fetching failures and cancellation end the
//! run with a [`PipelineError`] before anything is rendered. Item-level
//! enrichment failures stay inside the report. A failed publish is reported in
//! [`RunOutcome::status`] and leaves the rendered report intact.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reportgate_core::{AppConfig, EnrichedRecord, ReportLayout};
use reportgate_source::{fetch_collection, Pagination, ReportSource};

use crate::enrich::enrich;
use crate::error::{PipelineError, SinkError};
use crate::gate::{decide, PublishDecision};
use crate::progress::{ProgressSink, TracingProgress};
use crate::render::{render, Report};
use crate::sink::ReportSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Fetching,
    Enriching,
    Rendering,
    Deciding,
    Publishing,
    Skipped,
    Done,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Fetching => "fetching",
            RunPhase::Enriching => "enriching",
            RunPhase::Rendering => "rendering",
            RunPhase::Deciding => "deciding",
            RunPhase::Publishing => "publishing",
            RunPhase::Skipped => "skipped",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub pagination: Pagination,
    pub detail_concurrency: usize,
    pub recent_window_days: u32,
    /// Upper bound for the fetch and enrich phases together.
    pub deadline: Duration,
    /// Appended to the commit message.
    pub commit_marker: String,
    /// Render and decide, but never publish.
    pub dry_run: bool,
}

impl RunOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig, include_restricted: bool) -> Self {
        Self {
            pagination: Pagination {
                page_size: config.page_size,
                max_pages: config.max_pages,
                include_restricted,
            },
            detail_concurrency: config.detail_concurrency,
            recent_window_days: config.recent_window_days,
            deadline: config.run_deadline(),
            commit_marker: config.commit_marker.clone(),
            dry_run: false,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            pagination: Pagination::default(),
            detail_concurrency: 4,
            recent_window_days: 30,
            deadline: Duration::from_secs(600),
            commit_marker: "[skip ci]".to_owned(),
            dry_run: false,
        }
    }
}

#[derive(Debug)]
pub enum PublishStatus {
    Published,
    /// The gate found nothing new.
    Skipped,
    /// The gate wanted to publish but the run was a dry run.
    DryRun,
    /// The sink rejected the report.
    Failed(SinkError),
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    pub text: String,
    pub decision: PublishDecision,
    pub status: PublishStatus,
}

impl RunOutcome {
    #[must_use]
    pub fn failed_items(&self) -> usize {
        self.report.summary().failed_records
    }
}

pub struct Pipeline<'a> {
    source: &'a dyn ReportSource,
    sink: &'a dyn ReportSink,
    progress: &'a dyn ProgressSink,
    options: RunOptions,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(source: &'a dyn ReportSource, sink: &'a dyn ReportSink, options: RunOptions) -> Self {
        Self {
            source,
            sink,
            progress: &TracingProgress,
            options,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Executes one run.
    ///
    /// `generated_at` stamps the report; the pipeline never reads the clock.
    /// If `cancel` resolves, or the deadline passes, while fetching or
    /// enriching, in-flight requests are dropped and nothing is published.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Source`] when the probe or the listing fails.
    /// - [`PipelineError::Cancelled`] / [`PipelineError::DeadlineExceeded`].
    /// - [`PipelineError::ReadPrevious`] when the last report cannot be read.
    pub async fn run<C>(
        &self,
        generated_at: DateTime<Utc>,
        cancel: C,
    ) -> Result<RunOutcome, PipelineError>
    where
        C: Future<Output = ()>,
    {
        self.progress.phase(RunPhase::Idle);
        let layout = self
            .source
            .layout()
            .recent_window_days(self.options.recent_window_days);
        let deadline = self.options.deadline;

        let rows = tokio::select! {
            biased;
            () = cancel => {
                tracing::warn!(source = self.source.identity(), "run cancelled during collection");
                return Err(PipelineError::Cancelled);
            }
            result = tokio::time::timeout(deadline, self.collect(&layout)) => match result {
                Ok(rows) => rows?,
                Err(_) => {
                    return Err(PipelineError::DeadlineExceeded {
                        secs: deadline.as_secs(),
                    });
                }
            },
        };

        self.progress.phase(RunPhase::Rendering);
        let report = Report {
            generated_at,
            source_identity: self.source.identity().to_owned(),
            layout,
            rows,
        };
        let text = render(&report);

        self.progress.phase(RunPhase::Deciding);
        let previous = self
            .sink
            .read_previous()
            .await
            .map_err(PipelineError::ReadPrevious)?;
        let decision = decide(&text, previous.as_deref());
        tracing::info!(
            destination = %self.sink.destination(),
            changed = decision.changed,
            reason = %decision.reason,
            digest = %decision.digest,
            "publish decision"
        );

        let status = if !decision.changed {
            self.progress.phase(RunPhase::Skipped);
            PublishStatus::Skipped
        } else if self.options.dry_run {
            tracing::info!("dry run: not publishing");
            PublishStatus::DryRun
        } else {
            self.progress.phase(RunPhase::Publishing);
            let message = commit_message(&report, &self.options.commit_marker);
            match self.sink.publish(&text, &message).await {
                Ok(()) => PublishStatus::Published,
                Err(e) => {
                    tracing::error!(
                        destination = %self.sink.destination(),
                        error = %e,
                        "publishing the report failed"
                    );
                    PublishStatus::Failed(e)
                }
            }
        };

        self.progress.phase(RunPhase::Done);
        Ok(RunOutcome {
            report,
            text,
            decision,
            status,
        })
    }

    async fn collect(&self, layout: &ReportLayout) -> Result<Vec<EnrichedRecord>, PipelineError> {
        self.progress.phase(RunPhase::Fetching);
        let items = fetch_collection(self.source, &self.options.pagination).await?;

        self.progress.phase(RunPhase::Enriching);
        let source = self.source;
        let records = enrich(
            &items,
            &layout.columns,
            self.options.detail_concurrency,
            self.progress,
            |item| source.fetch_detail(item),
        )
        .await;
        Ok(records)
    }
}

/// `Update <title> <timestamp> <marker>`; the marker lets CI ignore the commit.
#[must_use]
pub fn commit_message(report: &Report, marker: &str) -> String {
    let stamp = report.generated_at.format("%Y-%m-%d %H:%M:%S UTC");
    let message = format!("Update {} {stamp} {}", report.layout.title, marker.trim());
    message.trim_end().to_owned()
}
