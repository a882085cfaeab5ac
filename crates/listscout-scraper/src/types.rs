//! Transport-level values passed between the fetcher and the extractor.

use scraper::Html;

/// A fetched page body together with the URL it came from.
///
/// The body is kept as text and parsed on demand: `scraper::Html` is not
/// `Send`, so it must never be held across an `.await`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    url: String,
    body: String,
}

impl Document {
    #[must_use]
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parses the body into a navigable HTML tree.
    #[must_use]
    pub fn parse(&self) -> Html {
        Html::parse_document(&self.body)
    }
}
