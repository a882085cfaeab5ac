use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {domain}")]
    RateLimited { domain: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid proxy {proxy}: {reason}")]
    InvalidProxy { proxy: String, reason: String },

    #[error("no scrape targets configured")]
    NoTargets,

    #[error("max_pages must be at least 1, got {max_pages}")]
    InvalidPageRange { max_pages: u32 },
}

impl ScraperError {
    /// Returns `true` for configuration problems that must stop a run before
    /// any request is made.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ScraperError::InvalidUrl { .. }
                | ScraperError::InvalidProxy { .. }
                | ScraperError::NoTargets
                | ScraperError::InvalidPageRange { .. }
        )
    }
}
