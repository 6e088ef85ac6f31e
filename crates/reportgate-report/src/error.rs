use std::path::PathBuf;

use reportgate_source::{SourceError, SourceErrorKind};
use thiserror::Error;

/// A detail fetch that failed for one item. Never fatal for the run.
#[derive(Debug, Clone, Error)]
#[error("enrichment failed for item \"{key}\": {reason}")]
pub struct ItemEnrichmentError {
    pub key: String,
    pub reason: String,
}

/// Errors from the persistence side of the publish gate.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error("report at {path} is not valid UTF-8")]
    NotUtf8 { path: PathBuf },
}

/// Fatal failures of one report run. Nothing is published when one is returned.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("run cancelled before the report was complete")]
    Cancelled,

    #[error("run exceeded its {secs}s deadline")]
    DeadlineExceeded { secs: u64 },

    #[error("could not read the previous report: {0}")]
    ReadPrevious(#[source] SinkError),
}

impl PipelineError {
    /// Cancellation and deadline count as connectivity failures: the next
    /// scheduled run is expected to succeed.
    #[must_use]
    pub fn source_kind(&self) -> Option<SourceErrorKind> {
        match self {
            PipelineError::Source(e) => Some(e.kind()),
            PipelineError::Cancelled | PipelineError::DeadlineExceeded { .. } => {
                Some(SourceErrorKind::Connectivity)
            }
            PipelineError::ReadPrevious(_) => None,
        }
    }
}
