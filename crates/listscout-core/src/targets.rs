use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn default_protocol() -> String {
    "http".to_string()
}

/// One upstream proxy as written in the targets file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

/// Scrape targets: category name → search/category URL, plus an optional
/// proxy pool.
///
/// ```yaml
/// categories:
///   wall_art: https://www.etsy.com/search?q=wall+art
///   posters: https://www.etsy.com/c/art-and-collectibles/prints/posters
/// proxies:
///   - host: 10.0.0.5
///     port: 3128
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetsFile {
    #[serde(default)]
    pub categories: BTreeMap<String, String>,
    #[serde(default)]
    pub proxies: Vec<ProxyConfig>,
}

/// Load and validate the targets file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_targets(path: &Path) -> Result<TargetsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TargetsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_targets(&content)
}

/// Parse and validate targets from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_targets(content: &str) -> Result<TargetsFile, ConfigError> {
    let targets: TargetsFile =
        serde_yaml::from_str(content).map_err(ConfigError::TargetsFileParse)?;

    validate_targets(&targets)?;

    Ok(targets)
}

fn validate_targets(targets: &TargetsFile) -> Result<(), ConfigError> {
    if targets.categories.is_empty() {
        return Err(ConfigError::Validation(
            "at least one category must be configured".to_string(),
        ));
    }

    for (name, url) in &targets.categories {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "category name must be non-empty".to_string(),
            ));
        }
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "category '{name}' has non-http URL \"{url}\""
            )));
        }
    }

    let mut seen_proxies = HashSet::new();
    for proxy in &targets.proxies {
        if proxy.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "proxy host must be non-empty".to_string(),
            ));
        }
        if proxy.port == 0 {
            return Err(ConfigError::Validation(format!(
                "proxy '{}' has invalid port 0",
                proxy.host
            )));
        }
        if !matches!(proxy.protocol.as_str(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "proxy '{}' has unsupported protocol '{}'; must be http or https",
                proxy.host, proxy.protocol
            )));
        }
        if proxy.username.is_some() != proxy.password.is_some() {
            return Err(ConfigError::Validation(format!(
                "proxy '{}' must set both username and password, or neither",
                proxy.host
            )));
        }
        if !seen_proxies.insert((proxy.host.to_lowercase(), proxy.port)) {
            return Err(ConfigError::Validation(format!(
                "duplicate proxy: {}:{}",
                proxy.host, proxy.port
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "targets_test.rs"]
mod tests;
