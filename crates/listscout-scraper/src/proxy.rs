//! Round-robin rotation over a pool of upstream proxies.
//!
//! A proxy reported failed is skipped until every proxy in the pool has
//! failed, at which point the failed set is cleared and rotation starts over
//! with the whole pool.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use listscout_core::ProxyConfig;

use crate::error::ScraperError;

#[derive(Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub protocol: String,
}

impl ProxyEndpoint {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
            protocol: "http".to_string(),
        }
    }

    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Proxy URL as consumed by the HTTP client, with credentials embedded
    /// when both username and password are set.
    #[must_use]
    pub fn url(&self) -> String {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => format!(
                "{}://{user}:{pass}@{}:{}",
                self.protocol, self.host, self.port
            ),
            _ => format!("{}://{}:{}", self.protocol, self.host, self.port),
        }
    }

    /// `host:port`, safe to log.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Builds the `reqwest` proxy for this endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidProxy`] if the URL is rejected.
    pub fn to_reqwest(&self) -> Result<reqwest::Proxy, ScraperError> {
        reqwest::Proxy::all(self.url()).map_err(|e| ScraperError::InvalidProxy {
            proxy: self.label(),
            reason: e.to_string(),
        })
    }
}

impl std::fmt::Debug for ProxyEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .field("protocol", &self.protocol)
            .finish()
    }
}

impl From<&ProxyConfig> for ProxyEndpoint {
    fn from(config: &ProxyConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            password: config.password.clone(),
            protocol: config.protocol.clone(),
        }
    }
}

/// A proxy handed out by [`ProxyManager::next`], tagged with its pool index
/// so a failure can be reported against the proxy actually used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyLease {
    pub index: usize,
    pub endpoint: ProxyEndpoint,
}

#[derive(Debug, Default)]
struct Rotation {
    cursor: usize,
    failed: BTreeSet<usize>,
}

#[derive(Debug, Default)]
pub struct ProxyManager {
    proxies: Vec<ProxyEndpoint>,
    rotation: Mutex<Rotation>,
}

impl ProxyManager {
    #[must_use]
    pub fn new(proxies: Vec<ProxyEndpoint>) -> Self {
        Self {
            proxies,
            rotation: Mutex::new(Rotation::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Rotation> {
        self.rotation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.lock().failed.len()
    }

    /// Next proxy in rotation, or `None` when the pool is empty.
    pub fn next(&self) -> Option<ProxyLease> {
        if self.proxies.is_empty() {
            return None;
        }

        let mut rotation = self.lock();
        let mut available: Vec<usize> = (0..self.proxies.len())
            .filter(|i| !rotation.failed.contains(i))
            .collect();
        if available.is_empty() {
            tracing::info!(
                proxies = self.proxies.len(),
                "every proxy marked failed; resetting failed set"
            );
            rotation.failed.clear();
            available = (0..self.proxies.len()).collect();
        }

        let index = available[rotation.cursor % available.len()];
        rotation.cursor = rotation.cursor.wrapping_add(1);

        Some(ProxyLease {
            index,
            endpoint: self.proxies[index].clone(),
        })
    }

    /// Excludes the proxy at `index` from rotation. Out-of-range indices are
    /// ignored.
    pub fn mark_failed(&self, index: usize) {
        if let Some(endpoint) = self.proxies.get(index) {
            tracing::warn!(proxy = %endpoint.label(), "marking proxy failed");
            self.lock().failed.insert(index);
        }
    }

    /// Checks that `endpoint` relays a GET to `test_url` with HTTP 200 within
    /// `timeout`.
    pub async fn probe(endpoint: &ProxyEndpoint, test_url: &str, timeout: Duration) -> bool {
        let built = endpoint.to_reqwest().and_then(|proxy| {
            let client = reqwest::Client::builder()
                .proxy(proxy)
                .timeout(timeout)
                .build()?;
            Ok(client)
        });
        let client = match built {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(proxy = %endpoint.label(), error = %e, "cannot build proxy client");
                return false;
            }
        };

        match client.get(test_url).send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                tracing::debug!(proxy = %endpoint.label(), error = %e, "proxy probe failed");
                false
            }
        }
    }
}
