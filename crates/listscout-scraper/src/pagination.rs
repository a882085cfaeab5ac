//! Page-numbered pagination over marketplace search and category URLs.
//!
//! Page N of a listing is the base URL with its `page` query parameter set
//! to N. The driver walks pages `1..=max_pages` and stops early on the first
//! page that comes back empty or short of a full page.
//!
//! ## State machine
//!
//! ```text
//! Fetching { page } ──record_page(n)──▶ Accumulated { page, yielded: n }
//! Accumulated ──advance()──▶ Fetching { page + 1 }
//!                        └─▶ Stopped(EmptyPage | PartialPage | MaxPagesReached)
//! ```

use std::future::Future;

use listscout_core::ProductRecord;

use crate::client::parse_http_url;
use crate::error::ScraperError;

/// A page yielding fewer records than this is treated as the last page.
pub const DEFAULT_FULL_PAGE_THRESHOLD: usize = 20;

/// Anything that can turn a page URL into listing records.
///
/// Implementations swallow fetch failures and return an empty `Vec`, which
/// the driver reads as the end of the listing.
pub trait ListingSource {
    fn scrape_page(&self, url: &str) -> impl Future<Output = Vec<ProductRecord>> + Send;
}

/// Builds the URL of page `page` of the listing at `base_url`.
///
/// The first `page` query parameter is replaced in place and any repeats are
/// dropped; if absent, `page` is appended. Every other query segment is kept
/// byte-for-byte, as is the fragment, so rewriting is idempotent.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] if `base_url` is not an absolute
/// http(s) URL.
pub fn page_url(base_url: &str, page: u32) -> Result<String, ScraperError> {
    let mut url = parse_http_url(base_url).map_err(|reason| ScraperError::InvalidUrl {
        url: base_url.to_owned(),
        reason,
    })?;

    let page_segment = format!("page={page}");
    let mut replaced = false;
    let mut segments: Vec<&str> = Vec::new();
    for segment in url.query().unwrap_or_default().split('&') {
        if segment.is_empty() {
            continue;
        }
        let key = segment.split_once('=').map_or(segment, |(key, _)| key);
        if key == "page" {
            if !replaced {
                segments.push(&page_segment);
                replaced = true;
            }
        } else {
            segments.push(segment);
        }
    }
    if !replaced {
        segments.push(&page_segment);
    }

    let query = segments.join("&");
    url.set_query(Some(&query));
    Ok(url.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxPagesReached,
    EmptyPage,
    PartialPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationState {
    Fetching { page: u32 },
    Accumulated { page: u32, yielded: usize },
    Stopped(StopReason),
}

/// The stopping decision, separated from I/O so it can be driven and
/// inspected directly.
#[derive(Debug, Clone)]
pub struct Paginator {
    max_pages: u32,
    full_page_threshold: usize,
    state: PaginationState,
}

impl Paginator {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidPageRange`] when `max_pages` is zero.
    pub fn new(max_pages: u32, full_page_threshold: usize) -> Result<Self, ScraperError> {
        if max_pages == 0 {
            return Err(ScraperError::InvalidPageRange { max_pages });
        }
        Ok(Self {
            max_pages,
            full_page_threshold,
            state: PaginationState::Fetching { page: 1 },
        })
    }

    #[must_use]
    pub fn state(&self) -> PaginationState {
        self.state
    }

    /// Records that the page being fetched yielded `yielded` records.
    /// Ignored outside the `Fetching` state.
    pub fn record_page(&mut self, yielded: usize) -> PaginationState {
        if let PaginationState::Fetching { page } = self.state {
            self.state = PaginationState::Accumulated { page, yielded };
        }
        self.state
    }

    /// Decides whether to fetch the next page. Ignored outside the
    /// `Accumulated` state.
    pub fn advance(&mut self) -> PaginationState {
        if let PaginationState::Accumulated { page, yielded } = self.state {
            self.state = if yielded == 0 {
                PaginationState::Stopped(StopReason::EmptyPage)
            } else if yielded < self.full_page_threshold {
                PaginationState::Stopped(StopReason::PartialPage)
            } else if page >= self.max_pages {
                PaginationState::Stopped(StopReason::MaxPagesReached)
            } else {
                PaginationState::Fetching { page: page + 1 }
            };
        }
        self.state
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaginationReport {
    pub records: Vec<ProductRecord>,
    pub pages_fetched: u32,
    pub stop_reason: StopReason,
}

/// Walks the listing at `base_url` page by page until the paginator stops.
///
/// # Errors
///
/// Returns a configuration error (invalid URL, zero `max_pages`) before any
/// page is requested. Failed pages are never errors.
pub async fn paginate<S>(
    source: &S,
    base_url: &str,
    max_pages: u32,
    full_page_threshold: usize,
) -> Result<PaginationReport, ScraperError>
where
    S: ListingSource + Sync,
{
    let mut paginator = Paginator::new(max_pages, full_page_threshold)?;
    page_url(base_url, 1)?;

    let mut records = Vec::new();
    let mut pages_fetched = 0;
    loop {
        match paginator.state() {
            PaginationState::Fetching { page } => {
                let url = page_url(base_url, page)?;
                let page_records = source.scrape_page(&url).await;
                pages_fetched += 1;
                tracing::info!(url = %url, page, records = page_records.len(), "scraped page");
                paginator.record_page(page_records.len());
                records.extend(page_records);
            }
            PaginationState::Accumulated { .. } => {
                paginator.advance();
            }
            PaginationState::Stopped(stop_reason) => {
                tracing::debug!(base_url, ?stop_reason, pages_fetched, "pagination stopped");
                return Ok(PaginationReport {
                    records,
                    pages_fetched,
                    stop_reason,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Returns `yields[n]` records on the n-th call, zero once exhausted.
    struct StubSource {
        yields: Vec<usize>,
        requested: Mutex<Vec<String>>,
    }

    impl StubSource {
        fn new(yields: Vec<usize>) -> Self {
            Self {
                yields,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl ListingSource for StubSource {
        async fn scrape_page(&self, url: &str) -> Vec<ProductRecord> {
            let call = {
                let mut requested = self.requested.lock().unwrap();
                requested.push(url.to_owned());
                requested.len() - 1
            };
            let n = self.yields.get(call).copied().unwrap_or(0);
            (0..n)
                .map(|i| ProductRecord {
                    title: format!("item {call}-{i}"),
                    ..ProductRecord::default()
                })
                .collect()
        }
    }

    const BASE: &str = "https://www.etsy.com/search?q=wall+art";

    #[tokio::test]
    async fn full_pages_run_to_max_pages() {
        let stub = StubSource::new(vec![22; 10]);
        let report = paginate(&stub, BASE, 5, DEFAULT_FULL_PAGE_THRESHOLD)
            .await
            .unwrap();
        assert_eq!(report.records.len(), 110);
        assert_eq!(report.pages_fetched, 5);
        assert_eq!(report.stop_reason, StopReason::MaxPagesReached);
        assert_eq!(stub.calls().len(), 5);
    }

    #[tokio::test]
    async fn partial_page_stops_early() {
        let stub = StubSource::new(vec![22, 22, 5, 22]);
        let report = paginate(&stub, BASE, 5, DEFAULT_FULL_PAGE_THRESHOLD)
            .await
            .unwrap();
        assert_eq!(report.records.len(), 49);
        assert_eq!(report.pages_fetched, 3);
        assert_eq!(report.stop_reason, StopReason::PartialPage);
    }

    #[tokio::test]
    async fn empty_first_page_stops_immediately() {
        let stub = StubSource::new(vec![0, 22]);
        let report = paginate(&stub, BASE, 5, DEFAULT_FULL_PAGE_THRESHOLD)
            .await
            .unwrap();
        assert!(report.records.is_empty());
        assert_eq!(report.pages_fetched, 1);
        assert_eq!(report.stop_reason, StopReason::EmptyPage);
    }

    #[tokio::test]
    async fn requests_successive_page_urls() {
        let stub = StubSource::new(vec![22, 22]);
        paginate(&stub, BASE, 2, DEFAULT_FULL_PAGE_THRESHOLD)
            .await
            .unwrap();
        assert_eq!(
            stub.calls(),
            vec![
                "https://www.etsy.com/search?q=wall+art&page=1".to_owned(),
                "https://www.etsy.com/search?q=wall+art&page=2".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn configuration_errors_precede_any_fetch() {
        let stub = StubSource::new(vec![22]);
        let zero = paginate(&stub, BASE, 0, DEFAULT_FULL_PAGE_THRESHOLD).await;
        assert!(matches!(zero, Err(ScraperError::InvalidPageRange { max_pages: 0 })));
        let bad = paginate(&stub, "not a url", 3, DEFAULT_FULL_PAGE_THRESHOLD).await;
        assert!(matches!(bad, Err(ScraperError::InvalidUrl { .. })));
        assert!(stub.calls().is_empty());
    }

    #[test]
    fn paginator_walks_the_state_machine() {
        let mut p = Paginator::new(2, 20).unwrap();
        assert_eq!(p.state(), PaginationState::Fetching { page: 1 });
        assert_eq!(
            p.record_page(25),
            PaginationState::Accumulated { page: 1, yielded: 25 }
        );
        assert_eq!(p.advance(), PaginationState::Fetching { page: 2 });
        p.record_page(20);
        assert_eq!(
            p.advance(),
            PaginationState::Stopped(StopReason::MaxPagesReached)
        );
        // Terminal state absorbs further input.
        assert_eq!(
            p.record_page(30),
            PaginationState::Stopped(StopReason::MaxPagesReached)
        );
    }

    #[test]
    fn empty_page_takes_precedence_over_max_pages() {
        let mut p = Paginator::new(1, 20).unwrap();
        p.record_page(0);
        assert_eq!(p.advance(), PaginationState::Stopped(StopReason::EmptyPage));
    }

    #[test]
    fn page_url_appends_missing_page_param() {
        assert_eq!(
            page_url(BASE, 3).unwrap(),
            "https://www.etsy.com/search?q=wall+art&page=3"
        );
        assert_eq!(
            page_url("https://www.etsy.com/c/posters", 2).unwrap(),
            "https://www.etsy.com/c/posters?page=2"
        );
    }

    #[test]
    fn page_url_replaces_in_place_and_keeps_fragment() {
        assert_eq!(
            page_url("https://x.test/c?page=1&ref=pagination&page=9#top", 4).unwrap(),
            "https://x.test/c?page=4&ref=pagination#top"
        );
    }

    #[test]
    fn page_url_is_idempotent() {
        let once = page_url(BASE, 2).unwrap();
        assert_eq!(page_url(&once, 2).unwrap(), once);
        let moved = page_url(&once, 7).unwrap();
        assert_eq!(moved, "https://www.etsy.com/search?q=wall+art&page=7");
    }

    #[test]
    fn page_url_keeps_percent_encoding_of_other_params() {
        let url = "https://www.etsy.com/search?q=wall%20art&page=3";
        assert_eq!(page_url(url, 3).unwrap(), url);
        assert_eq!(
            page_url(url, 4).unwrap(),
            "https://www.etsy.com/search?q=wall%20art&page=4"
        );
    }

    #[test]
    fn page_url_keeps_valueless_and_reserved_params() {
        let url = "https://www.etsy.com/c/posters?instant_download&page=3";
        assert_eq!(page_url(url, 3).unwrap(), url);
        assert_eq!(
            page_url("https://www.etsy.com/search?q=a,b~c&explicit=1", 2).unwrap(),
            "https://www.etsy.com/search?q=a,b~c&explicit=1&page=2"
        );
    }

    #[test]
    fn page_url_does_not_touch_keys_that_merely_contain_page() {
        assert_eq!(
            page_url("https://x.test/s?pagesize=48&page=1", 2).unwrap(),
            "https://x.test/s?pagesize=48&page=2"
        );
    }

    #[test]
    fn page_url_rejects_non_http() {
        assert!(matches!(
            page_url("mailto:shop@example.com", 1),
            Err(ScraperError::InvalidUrl { .. })
        ));
    }
}
