//! Resilient paginated listing scraper.
//!
//! [`Scraper`] fetches one page at a time under an adaptive
//! [`RateLimiter`]; [`ConcurrentScraper`] keeps several fetches in flight
//! behind a semaphore with per-request jitter. Both drive the same
//! [`PageFetcher`], [`CardExtractor`], and page-number [`pagination`].

pub mod clean;
pub mod client;
pub mod concurrent;
pub mod engine;
pub mod error;
pub mod extract;
pub mod identity;
pub mod pagination;
pub mod proxy;
pub mod rate_limit;
pub mod retry;
pub mod types;

pub use clean::{clean_records, parse_price};
pub use client::{FetchOutcome, FetcherConfig, Pacing, PageFetcher};
pub use concurrent::ConcurrentScraper;
pub use engine::{run_categories, Scraper};
pub use error::ScraperError;
pub use extract::{CardExtractor, DEFAULT_MARKETPLACE_ORIGIN};
pub use identity::{choose_profile, default_profiles, IdentityProfile};
pub use pagination::{
    page_url, paginate, ListingSource, PaginationReport, PaginationState, Paginator, StopReason,
    DEFAULT_FULL_PAGE_THRESHOLD,
};
pub use proxy::{ProxyEndpoint, ProxyLease, ProxyManager};
pub use rate_limit::{ErrorKind, RateLimiter};
pub use retry::RetryPolicy;
pub use types::Document;
