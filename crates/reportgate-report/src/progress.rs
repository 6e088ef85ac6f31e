//! Side-channel progress reporting for a run.
//!
//! Components receive a `&dyn ProgressSink` instead of writing to shared
//! state, so tests can record exactly what a run reported.

use crate::error::ItemEnrichmentError;
use crate::pipeline::RunPhase;

pub trait ProgressSink: Send + Sync {
    fn phase(&self, _phase: RunPhase) {}

    /// Called once per item as its detail fetch completes, in completion order.
    fn item_enriched(&self, _done: usize, _total: usize, _key: &str) {}

    fn item_failed(&self, _error: &ItemEnrichmentError) {}
}

/// Default sink: forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn phase(&self, phase: RunPhase) {
        tracing::info!(%phase, "report run phase");
    }

    fn item_enriched(&self, done: usize, total: usize, key: &str) {
        tracing::debug!(done, total, item = key, "item enriched");
        if done == total || done % 25 == 0 {
            tracing::info!(done, total, "enrichment progress");
        }
    }
}
