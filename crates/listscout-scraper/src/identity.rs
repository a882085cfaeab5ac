//! Browser identity profiles rotated across requests.
//!
//! The fetcher owns its profile list; picking one is a pure function of the
//! list and an RNG so tests can seed the choice.

use rand::seq::IndexedRandom;
use rand::Rng;
use reqwest::header;
use reqwest::RequestBuilder;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// User agents of current desktop browsers.
const DEFAULT_USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProfile {
    pub user_agent: String,
    pub accept_language: String,
}

impl IdentityProfile {
    #[must_use]
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            accept_language: "en-US,en;q=0.5".to_string(),
        }
    }
}

/// The built-in desktop browser profiles.
#[must_use]
pub fn default_profiles() -> Vec<IdentityProfile> {
    DEFAULT_USER_AGENTS
        .iter()
        .map(|ua| IdentityProfile::new(*ua))
        .collect()
}

/// Picks a profile uniformly at random; `None` only for an empty list.
#[must_use]
pub fn choose_profile<'a, R>(
    profiles: &'a [IdentityProfile],
    rng: &mut R,
) -> Option<&'a IdentityProfile>
where
    R: Rng + ?Sized,
{
    profiles.choose(rng)
}

/// Adds the baseline browser headers plus the profile's identity headers.
pub(crate) fn apply_headers(
    request: RequestBuilder,
    profile: Option<&IdentityProfile>,
) -> RequestBuilder {
    let request = request
        .header(header::ACCEPT, ACCEPT_HTML)
        .header(header::DNT, "1")
        .header(header::UPGRADE_INSECURE_REQUESTS, "1")
        .header("Sec-Fetch-Dest", "document")
        .header("Sec-Fetch-Mode", "navigate")
        .header("Sec-Fetch-Site", "none")
        .header(header::CACHE_CONTROL, "max-age=0");

    match profile {
        Some(p) => request
            .header(header::USER_AGENT, &p.user_agent)
            .header(header::ACCEPT_LANGUAGE, &p.accept_language),
        None => request.header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5"),
    }
}
