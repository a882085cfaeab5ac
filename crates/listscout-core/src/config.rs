use crate::app_config::AppConfig;
use crate::ConfigError;

/// Upper bound for any pacing delay, in seconds (one day).
pub const MAX_DELAY_SECS: f64 = 86_400.0;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value cannot be parsed or the values are
/// inconsistent (e.g. min delay above max delay).
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value cannot be parsed or fails validation.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it from a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let log_level = or_default("LISTSCOUT_LOG_LEVEL", "info");
    let targets_path = PathBuf::from(or_default(
        "LISTSCOUT_TARGETS_PATH",
        "./config/targets.yaml",
    ));
    let marketplace_origin = or_default("LISTSCOUT_MARKETPLACE_ORIGIN", "https://www.etsy.com");
    if !(marketplace_origin.starts_with("http://") || marketplace_origin.starts_with("https://")) {
        return Err(ConfigError::InvalidEnvVar {
            var: "LISTSCOUT_MARKETPLACE_ORIGIN".to_string(),
            reason: format!("\"{marketplace_origin}\" is not an http(s) origin"),
        });
    }

    let request_timeout_secs: u64 = parse_as(
        "LISTSCOUT_REQUEST_TIMEOUT_SECS",
        &or_default("LISTSCOUT_REQUEST_TIMEOUT_SECS", "30"),
    )?;
    let delay_min_secs: f64 = parse_as(
        "LISTSCOUT_DELAY_MIN_SECS",
        &or_default("LISTSCOUT_DELAY_MIN_SECS", "1.0"),
    )?;
    let delay_max_secs: f64 = parse_as(
        "LISTSCOUT_DELAY_MAX_SECS",
        &or_default("LISTSCOUT_DELAY_MAX_SECS", "10.0"),
    )?;
    let jitter_min_ms: u64 = parse_as(
        "LISTSCOUT_JITTER_MIN_MS",
        &or_default("LISTSCOUT_JITTER_MIN_MS", "500"),
    )?;
    let jitter_max_ms: u64 = parse_as(
        "LISTSCOUT_JITTER_MAX_MS",
        &or_default("LISTSCOUT_JITTER_MAX_MS", "1500"),
    )?;
    let max_retries: u32 = parse_as(
        "LISTSCOUT_MAX_RETRIES",
        &or_default("LISTSCOUT_MAX_RETRIES", "3"),
    )?;
    let retry_backoff_base_secs: u64 = parse_as(
        "LISTSCOUT_RETRY_BACKOFF_BASE_SECS",
        &or_default("LISTSCOUT_RETRY_BACKOFF_BASE_SECS", "1"),
    )?;
    let max_concurrent: usize = parse_as(
        "LISTSCOUT_MAX_CONCURRENT",
        &or_default("LISTSCOUT_MAX_CONCURRENT", "5"),
    )?;
    let max_pages: u32 = parse_as(
        "LISTSCOUT_MAX_PAGES",
        &or_default("LISTSCOUT_MAX_PAGES", "5"),
    )?;
    let full_page_threshold: usize = parse_as(
        "LISTSCOUT_FULL_PAGE_THRESHOLD",
        &or_default("LISTSCOUT_FULL_PAGE_THRESHOLD", "20"),
    )?;

    if !delay_min_secs.is_finite() || delay_min_secs < 0.0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "LISTSCOUT_DELAY_MIN_SECS".to_string(),
            reason: "must be a non-negative number of seconds".to_string(),
        });
    }
    if delay_min_secs > MAX_DELAY_SECS {
        return Err(ConfigError::InvalidEnvVar {
            var: "LISTSCOUT_DELAY_MIN_SECS".to_string(),
            reason: format!("must be at most {MAX_DELAY_SECS} seconds"),
        });
    }
    if !delay_max_secs.is_finite() || delay_max_secs < delay_min_secs {
        return Err(ConfigError::InvalidEnvVar {
            var: "LISTSCOUT_DELAY_MAX_SECS".to_string(),
            reason: format!("must be at least LISTSCOUT_DELAY_MIN_SECS ({delay_min_secs})"),
        });
    }
    if delay_max_secs > MAX_DELAY_SECS {
        return Err(ConfigError::InvalidEnvVar {
            var: "LISTSCOUT_DELAY_MAX_SECS".to_string(),
            reason: format!("must be at most {MAX_DELAY_SECS} seconds"),
        });
    }
    if jitter_max_ms < jitter_min_ms {
        return Err(ConfigError::InvalidEnvVar {
            var: "LISTSCOUT_JITTER_MAX_MS".to_string(),
            reason: format!("must be at least LISTSCOUT_JITTER_MIN_MS ({jitter_min_ms})"),
        });
    }
    if max_concurrent == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "LISTSCOUT_MAX_CONCURRENT".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(AppConfig {
        log_level,
        targets_path,
        marketplace_origin,
        request_timeout_secs,
        delay_min_secs,
        delay_max_secs,
        jitter_min_ms,
        jitter_max_ms,
        max_retries,
        retry_backoff_base_secs,
        max_concurrent,
        max_pages,
        full_page_threshold,
    })
}

/// Parse a raw env-var value, naming the variable in the error.
fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}
