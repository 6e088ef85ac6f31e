//! Per-item detail fan-out.

use std::fmt::Display;
use std::future::Future;

use futures::stream::{self, StreamExt};
use reportgate_core::{EnrichedRecord, MetricColumn, MetricMap, SourceItem};

use crate::error::ItemEnrichmentError;
use crate::progress::ProgressSink;

/// Joins every item with the metrics returned by `fetch_detail`.
///
/// Up to `concurrency` detail fetches run at once; results are reassembled in
/// input order, so concurrency never changes the output order. Each fetch is
/// isolated: a failure yields a record whose declared metrics are all
/// [`reportgate_core::MetricValue::Failed`], logs a warning, and is reported to
/// `progress`. The returned vector always has one record per input item.
pub async fn enrich<'s, F, Fut, E>(
    items: &'s [SourceItem],
    columns: &[MetricColumn],
    concurrency: usize,
    progress: &dyn ProgressSink,
    fetch_detail: F,
) -> Vec<EnrichedRecord>
where
    F: Fn(&'s SourceItem) -> Fut,
    Fut: Future<Output = Result<MetricMap, E>> + 's,
    E: Display,
{
    let total = items.len();
    let mut slots: Vec<Option<EnrichedRecord>> = (0..total).map(|_| None).collect();

    let mut results = stream::iter(items.iter().enumerate())
        .map(|(index, item)| {
            let fut = fetch_detail(item);
            async move { (index, item, fut.await) }
        })
        .buffer_unordered(concurrency.max(1));

    let mut done = 0usize;
    while let Some((index, item, result)) = results.next().await {
        done += 1;
        let record = match result {
            Ok(detail) => EnrichedRecord::from_detail(item.clone(), columns, detail),
            Err(e) => {
                let error = ItemEnrichmentError {
                    key: item.key.clone(),
                    reason: e.to_string(),
                };
                tracing::warn!(
                    item = %error.key,
                    error = %error.reason,
                    "detail fetch failed; marking item metrics as Error"
                );
                progress.item_failed(&error);
                EnrichedRecord::failed(item.clone(), columns)
            }
        };
        progress.item_enriched(done, total, &item.key);
        slots[index] = Some(record);
    }

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use reportgate_core::{ColumnKind, MetricValue};

    use super::*;

    #[derive(Default)]
    struct RecordingProgress {
        enriched: Mutex<Vec<(usize, usize, String)>>,
        failed: Mutex<Vec<String>>,
    }

    impl ProgressSink for RecordingProgress {
        fn item_enriched(&self, done: usize, total: usize, key: &str) {
            self.enriched
                .lock()
                .unwrap()
                .push((done, total, key.to_owned()));
        }

        fn item_failed(&self, error: &ItemEnrichmentError) {
            self.failed.lock().unwrap().push(error.key.clone());
        }
    }

    fn columns() -> Vec<MetricColumn> {
        vec![
            MetricColumn::new("ncloc", "Lines of Code", ColumnKind::Numeric),
            MetricColumn::new("last_analysis", "Last Analysis", ColumnKind::Timestamp),
        ]
    }

    fn items(n: usize) -> Vec<SourceItem> {
        (1..=n)
            .map(|i| SourceItem::new(format!("p{i}"), format!("Project {i}")))
            .collect()
    }

    fn detail(ncloc: &str) -> MetricMap {
        let mut m = MetricMap::new();
        m.insert("ncloc".into(), MetricValue::present(ncloc));
        m.insert("last_analysis".into(), MetricValue::present("2025-01-20"));
        m
    }

    #[tokio::test]
    async fn failing_item_is_marked_error_without_affecting_neighbours() {
        let items = items(3);
        let progress = RecordingProgress::default();

        let records = enrich(&items, &columns(), 2, &progress, |item| async move {
            if item.key == "p2" {
                Err("connection reset".to_string())
            } else {
                Ok(detail("100"))
            }
        })
        .await;

        assert_eq!(records.len(), 3);
        let keys: Vec<&str> = records.iter().map(|r| r.item.key.as_str()).collect();
        assert_eq!(keys, ["p1", "p2", "p3"]);

        assert!(records[1].metrics.values().all(MetricValue::is_failed));
        assert_eq!(records[1].metrics.len(), 2);
        for record in [&records[0], &records[2]] {
            assert_eq!(record.metric("ncloc"), &MetricValue::present("100"));
            assert_eq!(record.metric("last_analysis"), &MetricValue::present("2025-01-20"));
        }

        assert_eq!(*progress.failed.lock().unwrap(), vec!["p2".to_string()]);
    }

    #[tokio::test]
    async fn output_order_matches_input_even_when_completion_order_differs() {
        let items = items(5);
        let progress = RecordingProgress::default();

        // Earlier items sleep longer so they complete last.
        let records = enrich(&items, &columns(), 5, &progress, |item| async move {
            let idx: u64 = item.key[1..].parse().unwrap();
            tokio::time::sleep(Duration::from_millis((6 - idx) * 20)).await;
            Ok::<_, String>(detail(&idx.to_string()))
        })
        .await;

        let keys: Vec<&str> = records.iter().map(|r| r.item.key.as_str()).collect();
        assert_eq!(keys, ["p1", "p2", "p3", "p4", "p5"]);
        assert_eq!(records[0].metric("ncloc"), &MetricValue::present("1"));

        let enriched = progress.enriched.lock().unwrap();
        assert_eq!(enriched.len(), 5);
        assert_eq!(enriched.last().unwrap().0, 5);
        assert!(enriched.iter().all(|(_, total, _)| *total == 5));
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let items = items(8);
        let progress = RecordingProgress::default();
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        enrich(&items, &columns(), 3, &progress, |_item| {
            let in_flight = &in_flight;
            let peak = &peak;
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, String>(MetricMap::new())
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn missing_metrics_are_absent_not_error() {
        let items = items(1);
        let progress = RecordingProgress::default();

        let records = enrich(&items, &columns(), 1, &progress, |_item| async {
            let mut m = MetricMap::new();
            m.insert("ncloc".into(), MetricValue::present("10"));
            Ok::<_, String>(m)
        })
        .await;

        assert_eq!(records[0].metric("last_analysis"), &MetricValue::Absent);
        assert!(progress.failed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let progress = RecordingProgress::default();
        let records = enrich(&[], &columns(), 4, &progress, |_item| async {
            Ok::<_, String>(MetricMap::new())
        })
        .await;
        assert!(records.is_empty());
    }
}
