use serde::{Deserialize, Serialize};

/// One listing card scraped from a marketplace search or category page.
///
/// Every field holds the raw display text exactly as extracted; an empty
/// string means no selector matched. The extractor only emits records where
/// [`ProductRecord::is_identifiable`] holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub title: String,
    /// Display price, e.g. `"$25.99"` or `"24,50 €"`. Not parsed.
    pub price: String,
    /// Absolute listing URL.
    pub url: String,
    pub image_url: String,
    pub seller: String,
    pub rating: String,
    pub review_count: String,
    pub favorites: String,
    pub location: String,
    pub shipping: String,
    pub tags: String,
    pub description: String,
}

impl ProductRecord {
    /// Returns `true` if the record carries a title or a URL.
    #[must_use]
    pub fn is_identifiable(&self) -> bool {
        !self.title.is_empty() || !self.url.is_empty()
    }
}
