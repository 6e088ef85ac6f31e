pub mod enrich;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod progress;
pub mod render;
pub mod sink;

pub use enrich::enrich;
pub use error::{ItemEnrichmentError, PipelineError, SinkError};
pub use gate::{decide, PublishDecision, PublishReason};
pub use pipeline::{Pipeline, PublishStatus, RunOptions, RunOutcome, RunPhase};
pub use progress::{ProgressSink, TracingProgress};
pub use render::{render, summarize, Report, ReportSummary};
pub use sink::{FileSink, GitSink, PushTarget, ReportSink};
