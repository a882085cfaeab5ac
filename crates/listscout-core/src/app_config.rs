use std::path::PathBuf;

/// Runtime settings for a scrape, loaded from `LISTSCOUT_*` environment
/// variables by [`crate::load_app_config`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub log_level: String,
    pub targets_path: PathBuf,
    /// Origin that relative listing hrefs are resolved against.
    pub marketplace_origin: String,
    pub request_timeout_secs: u64,
    /// Floor of the adaptive delay, in seconds.
    pub delay_min_secs: f64,
    /// Ceiling of the adaptive delay, in seconds.
    pub delay_max_secs: f64,
    /// Pre-request jitter range for the concurrent engine.
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    pub max_concurrent: usize,
    pub max_pages: u32,
    /// Pages yielding fewer records than this are treated as the last page.
    pub full_page_threshold: usize,
}
