//! Page-number pagination over a [`ReportSource`] listing.
//!
//! Pages are requested starting at 1. A page is the last one when it holds
//! fewer items than requested, or when the source reports a total and that
//! many items have been seen. A hard page ceiling turns a source that never
//! returns a short page into [`SourceError::PaginationLimit`] instead of an
//! endless loop. Items past the ceiling are never fetched: this is a known cap
//! on very large collections, raise `max_pages` when it trips.

use std::collections::HashSet;

use reportgate_core::SourceItem;

use crate::error::SourceError;
use crate::source::ReportSource;

/// One page of a listing request. `number` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

impl PageRequest {
    /// Zero-based index of the first item on this page, for offset-style APIs.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.number.saturating_sub(1)) * u64::from(self.size)
    }
}

/// Items returned for one [`PageRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<SourceItem>,
    /// Collection size, when the source reports it.
    pub total: Option<u64>,
}

impl Page {
    #[must_use]
    pub fn new(items: Vec<SourceItem>) -> Self {
        Self { items, total: None }
    }

    #[must_use]
    pub fn with_total(items: Vec<SourceItem>, total: u64) -> Self {
        Self {
            items,
            total: Some(total),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_size: u32,
    pub max_pages: usize,
    /// Keep items the source marks restricted (private).
    pub include_restricted: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_size: 500,
            max_pages: 10,
            include_restricted: true,
        }
    }
}

/// Probes `source`, then lists the whole collection page by page.
///
/// Server order is preserved. Restricted items are dropped after listing when
/// `include_restricted` is `false`; the short-page check always uses the raw
/// page length.
///
/// # Errors
///
/// - Whatever [`ReportSource::probe`] returns (typically
///   [`SourceError::Authentication`]); no page is requested in that case.
/// - Any error from [`ReportSource::fetch_page`].
/// - [`SourceError::PaginationLimit`] when more than `max_pages` pages would be
///   needed.
/// - [`SourceError::DuplicateKey`] when a key repeats within the cycle.
pub async fn fetch_collection<S>(
    source: &S,
    pagination: &Pagination,
) -> Result<Vec<SourceItem>, SourceError>
where
    S: ReportSource + ?Sized,
{
    source.probe().await?;
    tracing::info!(source = source.identity(), "source probe succeeded");

    let page_size = pagination.page_size.max(1);
    let mut items: Vec<SourceItem> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut raw_seen: u64 = 0;
    let mut page_number: u32 = 0;

    loop {
        page_number += 1;
        if page_number as usize > pagination.max_pages {
            return Err(SourceError::PaginationLimit {
                identity: source.identity().to_owned(),
                max_pages: pagination.max_pages,
            });
        }

        let request = PageRequest {
            number: page_number,
            size: page_size,
        };
        let page = source.fetch_page(request).await?;
        let raw_len = page.items.len();
        raw_seen += raw_len as u64;

        tracing::debug!(
            source = source.identity(),
            page = page_number,
            items = raw_len,
            total = ?page.total,
            "fetched listing page"
        );

        for item in page.items {
            if !seen.insert(item.key.clone()) {
                return Err(SourceError::DuplicateKey {
                    identity: source.identity().to_owned(),
                    key: item.key,
                });
            }
            items.push(item);
        }

        let short_page = raw_len < page_size as usize;
        let reached_total = page.total.is_some_and(|total| raw_seen >= total);
        if short_page || reached_total {
            break;
        }
    }

    if !pagination.include_restricted {
        let before = items.len();
        items.retain(|item| !item.restricted);
        tracing::info!(
            source = source.identity(),
            dropped = before - items.len(),
            "excluded restricted items"
        );
    }

    tracing::info!(
        source = source.identity(),
        items = items.len(),
        pages = page_number,
        "listing complete"
    );
    Ok(items)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use reportgate_core::{MetricMap, ReportLayout};

    use super::*;

    /// In-memory source serving `total` items; optionally never short.
    struct FakeSource {
        total: usize,
        report_total: bool,
        endless: bool,
        healthy: bool,
        restricted_every: Option<usize>,
        requests: AtomicU32,
    }

    impl FakeSource {
        fn with_items(total: usize) -> Self {
            Self {
                total,
                report_total: false,
                endless: false,
                healthy: true,
                restricted_every: None,
                requests: AtomicU32::new(0),
            }
        }

        fn request_count(&self) -> u32 {
            self.requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReportSource for FakeSource {
        fn identity(&self) -> &str {
            "fake://source"
        }

        fn layout(&self) -> ReportLayout {
            ReportLayout::new("Fake", "Item")
        }

        async fn probe(&self) -> Result<(), SourceError> {
            if self.healthy {
                Ok(())
            } else {
                Err(SourceError::Authentication {
                    url: "fake://source".to_owned(),
                    reason: "probe reported invalid session".to_owned(),
                })
            }
        }

        async fn fetch_page(&self, page: PageRequest) -> Result<Page, SourceError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let size = page.size as usize;
            let start = usize::try_from(page.offset()).unwrap();
            let end = if self.endless {
                start + size
            } else {
                (start + size).min(self.total)
            };
            let items = (start.min(end)..end)
                .map(|i| {
                    let restricted = self.restricted_every.is_some_and(|n| i % n == 0);
                    SourceItem::new(format!("item-{i}"), format!("Item {i}")).restricted(restricted)
                })
                .collect();
            if self.report_total {
                Ok(Page::with_total(items, self.total as u64))
            } else {
                Ok(Page::new(items))
            }
        }

        async fn fetch_detail(&self, _item: &SourceItem) -> Result<MetricMap, SourceError> {
            Ok(MetricMap::new())
        }
    }

    fn pagination(page_size: u32, max_pages: usize) -> Pagination {
        Pagination {
            page_size,
            max_pages,
            include_restricted: true,
        }
    }

    #[tokio::test]
    async fn returns_all_items_in_order_with_ceil_page_requests() {
        let source = FakeSource::with_items(5);
        let items = fetch_collection(&source, &pagination(2, 10)).await.unwrap();

        let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, ["item-0", "item-1", "item-2", "item-3", "item-4"]);
        assert_eq!(source.request_count(), 3, "ceil(5/2) pages expected");
    }

    #[tokio::test]
    async fn reported_total_stops_after_exact_multiple_of_page_size() {
        let mut source = FakeSource::with_items(4);
        source.report_total = true;
        let items = fetch_collection(&source, &pagination(2, 10)).await.unwrap();

        assert_eq!(items.len(), 4);
        assert_eq!(source.request_count(), 2, "ceil(4/2) pages expected");
    }

    #[tokio::test]
    async fn empty_collection_needs_a_single_request() {
        let source = FakeSource::with_items(0);
        let items = fetch_collection(&source, &pagination(50, 10)).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(source.request_count(), 1);
    }

    #[tokio::test]
    async fn never_short_source_hits_page_ceiling() {
        let mut source = FakeSource::with_items(0);
        source.endless = true;
        let result = fetch_collection(&source, &pagination(3, 4)).await;

        assert!(
            matches!(result, Err(SourceError::PaginationLimit { max_pages: 4, .. })),
            "expected PaginationLimit, got: {result:?}"
        );
        assert_eq!(source.request_count(), 4);
    }

    #[tokio::test]
    async fn failed_probe_skips_pagination() {
        let mut source = FakeSource::with_items(3);
        source.healthy = false;
        let result = fetch_collection(&source, &pagination(2, 10)).await;

        assert!(matches!(result, Err(SourceError::Authentication { .. })));
        assert_eq!(source.request_count(), 0);
    }

    #[tokio::test]
    async fn restricted_items_are_dropped_without_affecting_termination() {
        let mut source = FakeSource::with_items(4);
        source.restricted_every = Some(2);
        let mut config = pagination(2, 10);
        config.include_restricted = false;

        let items = fetch_collection(&source, &config).await.unwrap();

        let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, ["item-1", "item-3"]);
        // Two full pages plus the empty third page.
        assert_eq!(source.request_count(), 3);
    }

    #[test]
    fn page_request_offset_is_zero_based() {
        assert_eq!(PageRequest { number: 1, size: 100 }.offset(), 0);
        assert_eq!(PageRequest { number: 3, size: 100 }.offset(), 200);
    }
}
