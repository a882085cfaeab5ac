//! Concurrent scraping engine.
//!
//! Up to `max_concurrent` page fetches are in flight at once, gated by a
//! semaphore. Each fetch sleeps its own random jitter instead of sharing the
//! adaptive limiter, and results are merged in completion order.

use std::collections::BTreeMap;

use futures::stream::{FuturesUnordered, StreamExt};
use listscout_core::{AppConfig, ProductRecord};
use tokio::sync::Semaphore;

use crate::client::{FetcherConfig, Pacing, PageFetcher};
use crate::engine::validate_categories;
use crate::error::ScraperError;
use crate::extract::CardExtractor;
use crate::pagination::{
    page_url, ListingSource, PaginationReport, PaginationState, Paginator,
    DEFAULT_FULL_PAGE_THRESHOLD,
};
use crate::proxy::ProxyEndpoint;

#[derive(Debug)]
pub struct ConcurrentScraper {
    fetcher: PageFetcher,
    extractor: CardExtractor,
    admission: Semaphore,
    full_page_threshold: usize,
}

impl ConcurrentScraper {
    /// `max_concurrent` below 1 is raised to 1.
    #[must_use]
    pub fn new(fetcher: PageFetcher, extractor: CardExtractor, max_concurrent: usize) -> Self {
        Self {
            fetcher,
            extractor,
            admission: Semaphore::new(max_concurrent.max(1)),
            full_page_threshold: DEFAULT_FULL_PAGE_THRESHOLD,
        }
    }

    /// Builds a jitter-paced engine from runtime settings.
    ///
    /// # Errors
    ///
    /// Returns a [`ScraperError`] if the origin or a proxy is invalid, or if
    /// the HTTP client cannot be built.
    pub fn from_app_config(
        config: &AppConfig,
        proxies: Vec<ProxyEndpoint>,
    ) -> Result<Self, ScraperError> {
        let fetcher = PageFetcher::new(
            FetcherConfig::from_app_config(config, proxies),
            Pacing::jitter_from(config),
        )?;
        let extractor = CardExtractor::new(&config.marketplace_origin)?;
        Ok(Self::new(fetcher, extractor, config.max_concurrent)
            .with_full_page_threshold(config.full_page_threshold))
    }

    #[must_use]
    pub fn with_full_page_threshold(mut self, threshold: usize) -> Self {
        self.full_page_threshold = threshold;
        self
    }

    /// Fetches and extracts one page once an admission permit is free.
    pub async fn scrape_page(&self, url: &str) -> Vec<ProductRecord> {
        let Ok(_permit) = self.admission.acquire().await else {
            tracing::warn!(url, "admission semaphore closed; skipping page");
            return Vec::new();
        };
        match self.fetcher.fetch(url).await {
            Some(document) => self.extractor.extract(&document),
            None => {
                tracing::warn!(url, "giving up on page after retries");
                Vec::new()
            }
        }
    }

    /// Scrapes every URL concurrently and merges the records in completion
    /// order.
    pub async fn scrape_pages(&self, urls: &[String]) -> Vec<ProductRecord> {
        let mut in_flight: FuturesUnordered<_> =
            urls.iter().map(|url| self.scrape_page(url)).collect();

        let mut records = Vec::new();
        while let Some(batch) = in_flight.next().await {
            records.extend(batch);
        }
        records
    }

    /// Fetches pages `1..=max_pages` concurrently, then applies the stopping
    /// rule in page order: records from pages after the stop are discarded.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any request is made.
    pub async fn paginate(
        &self,
        base_url: &str,
        max_pages: u32,
    ) -> Result<PaginationReport, ScraperError> {
        let mut paginator = Paginator::new(max_pages, self.full_page_threshold)?;
        let urls = (1..=max_pages)
            .map(|page| page_url(base_url, page))
            .collect::<Result<Vec<_>, _>>()?;

        let mut in_flight: FuturesUnordered<_> = urls
            .iter()
            .zip(1u32..)
            .map(|(url, page)| async move { (page, url, self.scrape_page(url).await) })
            .collect();

        let mut pages: BTreeMap<u32, Vec<ProductRecord>> = BTreeMap::new();
        while let Some((page, url, batch)) = in_flight.next().await {
            tracing::info!(url = %url, page, records = batch.len(), "scraped page");
            pages.insert(page, batch);
        }

        let mut records = Vec::new();
        loop {
            match paginator.state() {
                PaginationState::Fetching { page } => {
                    let batch = pages.remove(&page).unwrap_or_default();
                    paginator.record_page(batch.len());
                    records.extend(batch);
                }
                PaginationState::Accumulated { .. } => {
                    paginator.advance();
                }
                PaginationState::Stopped(stop_reason) => {
                    return Ok(PaginationReport {
                        records,
                        pages_fetched: max_pages,
                        stop_reason,
                    });
                }
            }
        }
    }

    /// Paginates every category concurrently, keyed by category name.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any request is made.
    pub async fn run_categories(
        &self,
        categories: &BTreeMap<String, String>,
        max_pages: u32,
    ) -> Result<BTreeMap<String, Vec<ProductRecord>>, ScraperError> {
        validate_categories(categories, max_pages)?;

        let mut in_flight: FuturesUnordered<_> = categories
            .iter()
            .map(|(name, url)| async move { (name, self.paginate(url, max_pages).await) })
            .collect();

        let mut results = BTreeMap::new();
        while let Some((name, report)) = in_flight.next().await {
            let records = match report {
                Ok(report) => {
                    tracing::info!(
                        category = %name,
                        records = report.records.len(),
                        stop_reason = ?report.stop_reason,
                        "category complete"
                    );
                    report.records
                }
                Err(e) => {
                    tracing::warn!(category = %name, error = %e, "category failed");
                    Vec::new()
                }
            };
            results.insert(name.clone(), records);
        }
        Ok(results)
    }
}

impl ListingSource for ConcurrentScraper {
    async fn scrape_page(&self, url: &str) -> Vec<ProductRecord> {
        ConcurrentScraper::scrape_page(self, url).await
    }
}
