//! Scrape command handlers.
//!
//! Configuration problems abort the run before any request is sent; page and
//! category failures are logged by the engines and show up as missing
//! records.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use listscout_core::{AppConfig, ProductRecord};
use listscout_scraper::{
    ConcurrentScraper, PaginationReport, ProxyEndpoint, Scraper, ScraperError,
};

use crate::output;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunOptions {
    pub max_pages: u32,
    pub concurrent: bool,
    pub clean: bool,
    pub output: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

/// The two engines behind one call surface.
enum Engine {
    Serialized(Scraper),
    Concurrent(ConcurrentScraper),
}

impl Engine {
    fn build(
        config: &AppConfig,
        proxies: Vec<ProxyEndpoint>,
        concurrent: bool,
    ) -> Result<Self, ScraperError> {
        Ok(if concurrent {
            Engine::Concurrent(ConcurrentScraper::from_app_config(config, proxies)?)
        } else {
            Engine::Serialized(Scraper::from_app_config(config, proxies)?)
        })
    }

    async fn paginate(&self, url: &str, max_pages: u32) -> Result<PaginationReport, ScraperError> {
        match self {
            Engine::Serialized(s) => s.paginate(url, max_pages).await,
            Engine::Concurrent(s) => s.paginate(url, max_pages).await,
        }
    }

    async fn run_categories(
        &self,
        categories: &BTreeMap<String, String>,
        max_pages: u32,
    ) -> Result<BTreeMap<String, Vec<ProductRecord>>, ScraperError> {
        match self {
            Engine::Serialized(s) => s.run_categories(categories, max_pages).await,
            Engine::Concurrent(s) => s.run_categories(categories, max_pages).await,
        }
    }
}

/// Reads the proxy pool from a targets file.
pub(crate) fn load_proxies(path: &Path) -> anyhow::Result<Vec<ProxyEndpoint>> {
    let targets = listscout_core::load_targets(path)
        .with_context(|| format!("failed to load targets from {}", path.display()))?;
    Ok(targets.proxies.iter().map(ProxyEndpoint::from).collect())
}

async fn within<T>(
    timeout: Option<Duration>,
    fut: impl std::future::Future<Output = T>,
) -> anyhow::Result<T> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| anyhow::anyhow!("run timed out after {}s", limit.as_secs())),
        None => Ok(fut.await),
    }
}

pub(crate) async fn run_scrape(
    config: &AppConfig,
    url: &str,
    proxies: Vec<ProxyEndpoint>,
    options: &RunOptions,
) -> anyhow::Result<()> {
    let engine = Engine::build(config, proxies, options.concurrent)
        .context("failed to build scraper")?;

    let report = within(options.timeout, engine.paginate(url, options.max_pages))
        .await?
        .with_context(|| format!("cannot paginate {url}"))?;

    tracing::info!(
        url,
        records = report.records.len(),
        pages = report.pages_fetched,
        stop_reason = ?report.stop_reason,
        "scrape complete"
    );

    let records = output::prepare(report.records, options.clean);
    output::write_json(&records, options.output.as_deref())
}

pub(crate) async fn run_categories(
    config: &AppConfig,
    targets_path: &Path,
    options: &RunOptions,
) -> anyhow::Result<()> {
    let targets = listscout_core::load_targets(targets_path)
        .with_context(|| format!("failed to load targets from {}", targets_path.display()))?;
    let proxies = targets.proxies.iter().map(ProxyEndpoint::from).collect();

    let engine = Engine::build(config, proxies, options.concurrent)
        .context("failed to build scraper")?;

    let results = within(
        options.timeout,
        engine.run_categories(&targets.categories, options.max_pages),
    )
    .await?
    .context("cannot run categories")?;

    let total: usize = results.values().map(Vec::len).sum();
    tracing::info!(categories = results.len(), records = total, "category run complete");

    let prepared: BTreeMap<String, Vec<output::OutputRecord>> = results
        .into_iter()
        .map(|(name, records)| (name, output::prepare(records, options.clean)))
        .collect();
    output::write_json(&prepared, options.output.as_deref())
}
