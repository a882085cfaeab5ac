//! Resilient HTML page fetcher.
//!
//! [`PageFetcher`] issues one GET per attempt with a rotating browser
//! identity, optionally through a rotating proxy, and retries failures
//! under a [`RetryPolicy`]. Exhausting the budget yields
//! [`FetchOutcome::Absent`]; fetch failures never surface as errors.

mod origin;

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use listscout_core::{AppConfig, MAX_DELAY_SECS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::{Client, StatusCode};

use crate::error::ScraperError;
use crate::identity::{self, IdentityProfile};
use crate::proxy::{ProxyEndpoint, ProxyLease, ProxyManager};
use crate::rate_limit::{ErrorKind, RateLimiter};
use crate::retry::RetryPolicy;
use crate::types::Document;

pub(crate) use origin::{absolutize, extract_domain, parse_http_url};

/// How the fetcher spaces its requests.
#[derive(Debug)]
pub enum Pacing {
    /// Shared adaptive delay; used by the serialized engine.
    Adaptive(RateLimiter),
    /// Independent random sleep in `[min, max]` before every request; used
    /// by the concurrent engine.
    Jitter { min: Duration, max: Duration },
}

impl Pacing {
    /// Adaptive pacing over the configured delay range. Out-of-range
    /// seconds are clamped to `[0, MAX_DELAY_SECS]`.
    #[must_use]
    pub fn adaptive_from(config: &AppConfig) -> Self {
        Pacing::Adaptive(RateLimiter::new(
            delay_from_secs(config.delay_min_secs),
            delay_from_secs(config.delay_max_secs),
        ))
    }

    /// Jitter pacing over the configured jitter range.
    #[must_use]
    pub fn jitter_from(config: &AppConfig) -> Self {
        Pacing::Jitter {
            min: Duration::from_millis(config.jitter_min_ms),
            max: Duration::from_millis(config.jitter_max_ms),
        }
    }

    /// No spacing at all.
    #[must_use]
    pub fn none() -> Self {
        Pacing::Jitter {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }
}

/// Converts configured seconds to a `Duration` without panicking; NaN maps
/// to zero.
fn delay_from_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.clamp(0.0, MAX_DELAY_SECS)).unwrap_or(Duration::ZERO)
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    /// Identity profiles rotated per request. An empty list sends only the
    /// baseline headers and the client's default user agent.
    pub profiles: Vec<IdentityProfile>,
    pub proxies: Vec<ProxyEndpoint>,
    /// Seeds profile selection and jitter; `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            profiles: identity::default_profiles(),
            proxies: Vec::new(),
            rng_seed: None,
        }
    }
}

impl FetcherConfig {
    /// Timeout and retry settings from `config`, default identity profiles,
    /// and the given proxy pool.
    #[must_use]
    pub fn from_app_config(config: &AppConfig, proxies: Vec<ProxyEndpoint>) -> Self {
        Self {
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            retry: RetryPolicy::new(
                config.max_retries,
                Duration::from_secs(config.retry_backoff_base_secs),
            ),
            profiles: identity::default_profiles(),
            proxies,
            rng_seed: None,
        }
    }
}

/// Result of fetching one page under the retry budget.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(Document),
    /// Every allowed attempt failed.
    Absent {
        attempts: u32,
        last_error: ScraperError,
    },
}

impl FetchOutcome {
    #[must_use]
    pub fn into_document(self) -> Option<Document> {
        match self {
            FetchOutcome::Fetched(document) => Some(document),
            FetchOutcome::Absent { .. } => None,
        }
    }

    #[must_use]
    pub fn is_fetched(&self) -> bool {
        matches!(self, FetchOutcome::Fetched(_))
    }
}

#[derive(Debug)]
pub struct PageFetcher {
    direct: Client,
    /// One client per proxy, index-aligned with the proxy pool.
    proxied: Vec<Client>,
    proxies: ProxyManager,
    profiles: Vec<IdentityProfile>,
    retry: RetryPolicy,
    pacing: Pacing,
    rng: Mutex<StdRng>,
}

impl PageFetcher {
    /// Builds the HTTP clients for the direct route and every proxy.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidProxy`] if a proxy URL is rejected, or
    /// [`ScraperError::Http`] if a client cannot be constructed.
    pub fn new(config: FetcherConfig, pacing: Pacing) -> Result<Self, ScraperError> {
        let build = |proxy: Option<reqwest::Proxy>| -> Result<Client, ScraperError> {
            let mut builder = Client::builder()
                .timeout(config.request_timeout)
                .connect_timeout(Duration::from_secs(10));
            if let Some(proxy) = proxy {
                builder = builder.proxy(proxy);
            }
            Ok(builder.build()?)
        };

        let direct = build(None)?;
        let proxied = config
            .proxies
            .iter()
            .map(|endpoint| build(Some(endpoint.to_reqwest()?)))
            .collect::<Result<Vec<_>, _>>()?;

        let rng = config
            .rng_seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        Ok(Self {
            direct,
            proxied,
            proxies: ProxyManager::new(config.proxies),
            profiles: config.profiles,
            retry: config.retry,
            pacing,
            rng: Mutex::new(rng),
        })
    }

    /// The adaptive limiter, when pacing is adaptive.
    #[must_use]
    pub fn rate_limiter(&self) -> Option<&RateLimiter> {
        match &self.pacing {
            Pacing::Adaptive(limiter) => Some(limiter),
            Pacing::Jitter { .. } => None,
        }
    }

    #[must_use]
    pub fn proxies(&self) -> &ProxyManager {
        &self.proxies
    }

    /// Fetches `url`, returning `None` once the retry budget is exhausted.
    pub async fn fetch(&self, url: &str) -> Option<Document> {
        self.fetch_outcome(url).await.into_document()
    }

    /// Fetches `url` and reports how the attempts went.
    pub async fn fetch_outcome(&self, url: &str) -> FetchOutcome {
        let mut attempt: u32 = 0;
        loop {
            self.pace().await;

            let lease = self.proxies.next();
            let profile = self.pick_profile();

            let error = match self.attempt(url, lease.as_ref(), profile.as_ref()).await {
                Ok(document) => {
                    if let Some(limiter) = self.rate_limiter() {
                        limiter.on_success();
                    }
                    return FetchOutcome::Fetched(document);
                }
                Err(error) => error,
            };

            let kind = classify(&error);
            if kind == ErrorKind::Transport {
                if let Some(lease) = &lease {
                    self.proxies.mark_failed(lease.index);
                }
            }

            let will_retry = self.retry.should_retry(attempt);
            tracing::warn!(
                url,
                attempt = attempt + 1,
                max_attempts = self.retry.max_attempts(),
                proxy = ?lease.as_ref().map(|l| l.endpoint.label()),
                will_retry,
                error = %error,
                "page fetch attempt failed"
            );

            // A 429 backs off before telling the limiter; other failures
            // report first so the next attempt sees the grown delay.
            if kind == ErrorKind::RateLimit && will_retry {
                tokio::time::sleep(self.retry.backoff(attempt)).await;
            }
            if let Some(limiter) = self.rate_limiter() {
                limiter.on_error(kind).await;
            }

            if !will_retry {
                return FetchOutcome::Absent {
                    attempts: attempt + 1,
                    last_error: error,
                };
            }

            if kind != ErrorKind::RateLimit {
                tokio::time::sleep(self.retry.backoff(attempt)).await;
            }
            attempt += 1;
        }
    }

    async fn pace(&self) {
        match &self.pacing {
            Pacing::Adaptive(limiter) => limiter.wait().await,
            Pacing::Jitter { min, max } => {
                let sleep_for = self.jitter(*min, *max);
                if !sleep_for.is_zero() {
                    tracing::debug!(
                        jitter_ms = u64::try_from(sleep_for.as_millis()).unwrap_or(u64::MAX),
                        "jitter before request"
                    );
                    tokio::time::sleep(sleep_for).await;
                }
            }
        }
    }

    fn jitter(&self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let secs = rng.random_range(min.as_secs_f64()..=max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    fn pick_profile(&self) -> Option<IdentityProfile> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        identity::choose_profile(&self.profiles, &mut *rng).cloned()
    }

    async fn attempt(
        &self,
        url: &str,
        lease: Option<&ProxyLease>,
        profile: Option<&IdentityProfile>,
    ) -> Result<Document, ScraperError> {
        let client = lease
            .and_then(|l| self.proxied.get(l.index))
            .unwrap_or(&self.direct);

        let response = identity::apply_headers(client.get(url), profile)
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ScraperError::RateLimited {
                domain: extract_domain(url),
            });
        }
        if status != StatusCode::OK {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await?;
        Ok(Document::new(final_url, body))
    }
}

/// Maps a failed attempt onto the limiter's error classes.
fn classify(error: &ScraperError) -> ErrorKind {
    match error {
        ScraperError::RateLimited { .. } => ErrorKind::RateLimit,
        ScraperError::UnexpectedStatus { .. } => ErrorKind::Http,
        _ => ErrorKind::Transport,
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
