//! Serialized scraping engine and the category driver.

use std::collections::BTreeMap;

use listscout_core::{AppConfig, ProductRecord};

use crate::client::{FetcherConfig, Pacing, PageFetcher};
use crate::error::ScraperError;
use crate::extract::CardExtractor;
use crate::pagination::{
    self, page_url, ListingSource, PaginationReport, DEFAULT_FULL_PAGE_THRESHOLD,
};
use crate::proxy::ProxyEndpoint;

/// Rejects a category run that could never make a request.
pub(crate) fn validate_categories(
    categories: &BTreeMap<String, String>,
    max_pages: u32,
) -> Result<(), ScraperError> {
    if categories.is_empty() {
        return Err(ScraperError::NoTargets);
    }
    if max_pages == 0 {
        return Err(ScraperError::InvalidPageRange { max_pages });
    }
    for url in categories.values() {
        page_url(url, 1)?;
    }
    Ok(())
}

/// Paginates every category in turn, keyed by category name.
///
/// A category whose pages all fail maps to an empty `Vec`.
///
/// # Errors
///
/// Returns [`ScraperError::NoTargets`], [`ScraperError::InvalidPageRange`],
/// or [`ScraperError::InvalidUrl`] before any request is made.
pub async fn run_categories<S>(
    source: &S,
    categories: &BTreeMap<String, String>,
    max_pages: u32,
    full_page_threshold: usize,
) -> Result<BTreeMap<String, Vec<ProductRecord>>, ScraperError>
where
    S: ListingSource + Sync,
{
    validate_categories(categories, max_pages)?;

    let mut results = BTreeMap::new();
    for (name, url) in categories {
        tracing::info!(category = %name, url = %url, "scraping category");
        let report = pagination::paginate(source, url, max_pages, full_page_threshold).await?;
        tracing::info!(
            category = %name,
            records = report.records.len(),
            pages = report.pages_fetched,
            stop_reason = ?report.stop_reason,
            "category complete"
        );
        results.insert(name.clone(), report.records);
    }
    Ok(results)
}

/// One-request-at-a-time engine paced by the adaptive rate limiter.
#[derive(Debug)]
pub struct Scraper {
    fetcher: PageFetcher,
    extractor: CardExtractor,
    full_page_threshold: usize,
}

impl Scraper {
    #[must_use]
    pub fn new(fetcher: PageFetcher, extractor: CardExtractor) -> Self {
        Self {
            fetcher,
            extractor,
            full_page_threshold: DEFAULT_FULL_PAGE_THRESHOLD,
        }
    }

    /// Builds an adaptively paced engine from runtime settings.
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
            Pacing::adaptive_from(config),
        )?;
        let extractor = CardExtractor::new(&config.marketplace_origin)?;
        Ok(Self::new(fetcher, extractor).with_full_page_threshold(config.full_page_threshold))
    }

    #[must_use]
    pub fn with_full_page_threshold(mut self, threshold: usize) -> Self {
        self.full_page_threshold = threshold;
        self
    }

    /// Fetches one listing page and extracts its cards. A failed fetch
    /// yields an empty `Vec`.
    pub async fn scrape_search_page(&self, url: &str) -> Vec<ProductRecord> {
        match self.fetcher.fetch(url).await {
            Some(document) => self.extractor.extract(&document),
            None => {
                tracing::warn!(url, "giving up on page after retries");
                Vec::new()
            }
        }
    }

    /// # Errors
    ///
    /// See [`pagination::paginate`].
    pub async fn paginate(
        &self,
        base_url: &str,
        max_pages: u32,
    ) -> Result<PaginationReport, ScraperError> {
        pagination::paginate(self, base_url, max_pages, self.full_page_threshold).await
    }

    /// # Errors
    ///
    /// See [`run_categories`].
    pub async fn run_categories(
        &self,
        categories: &BTreeMap<String, String>,
        max_pages: u32,
    ) -> Result<BTreeMap<String, Vec<ProductRecord>>, ScraperError> {
        run_categories(self, categories, max_pages, self.full_page_threshold).await
    }
}

impl ListingSource for Scraper {
    async fn scrape_page(&self, url: &str) -> Vec<ProductRecord> {
        self.scrape_search_page(url).await
    }
}
