//! Listing-card extraction from search and category pages.
//!
//! Marketplace markup drifts between layouts, so both card discovery and
//! every field go through ordered fallback tables: the first card selector
//! that matches anything is used for the whole document, and per field the
//! first rule producing non-empty text wins.

use std::sync::LazyLock;

use listscout_core::ProductRecord;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::client::{absolutize, parse_http_url};
use crate::error::ScraperError;
use crate::types::Document;

pub const DEFAULT_MARKETPLACE_ORIGIN: &str = "https://www.etsy.com";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Card container selectors in priority order.
static CARD_SELECTORS: LazyLock<Vec<(&'static str, Selector)>> = LazyLock::new(|| {
    [
        "li.wt-list-unstyled",
        "li[data-listing-id]",
        "li[data-logger-id]",
        ".listing-card",
        "[data-test-id='listing-card']",
    ]
    .into_iter()
    .map(|css| (css, selector(css)))
    .collect()
});

/// One way of reading a field out of a card.
#[derive(Debug)]
enum Rule {
    /// Whitespace-normalized text of the first match.
    Text(Selector),
    /// Attribute value of the first match.
    Attr(Selector, &'static str),
}

impl Rule {
    fn text(css: &str) -> Self {
        Rule::Text(selector(css))
    }

    fn attr(css: &str, attr: &'static str) -> Self {
        Rule::Attr(selector(css), attr)
    }

    fn apply(&self, card: ElementRef<'_>) -> Option<String> {
        let value = match self {
            Rule::Text(sel) => card.select(sel).next().map(element_text)?,
            Rule::Attr(sel, attr) => card
                .select(sel)
                .next()
                .and_then(|el| el.value().attr(attr))?
                .trim()
                .to_owned(),
        };
        (!value.is_empty()).then_some(value)
    }
}

/// Field rule tables, one per extracted `ProductRecord` field.
struct FieldRules {
    title: Vec<Rule>,
    price: Vec<Rule>,
    url: Vec<Rule>,
    image_url: Vec<Rule>,
    seller: Vec<Rule>,
    rating: Vec<Rule>,
    review_count: Vec<Rule>,
    favorites: Vec<Rule>,
    location: Vec<Rule>,
    shipping: Vec<Rule>,
}

static FIELD_RULES: LazyLock<FieldRules> = LazyLock::new(|| FieldRules {
    title: vec![
        Rule::text("h3"),
        Rule::text(".wt-text-truncate"),
        Rule::text("[data-test-id='listing-card-title']"),
    ],
    price: vec![
        Rule::text(".currency-value"),
        Rule::text(".wt-text-title-01"),
        Rule::text("[data-test-id='price']"),
    ],
    url: vec![Rule::attr("a", "href")],
    image_url: vec![Rule::attr("img", "src"), Rule::attr("img", "data-src")],
    seller: vec![
        Rule::text(".shop-name"),
        Rule::text("[data-test-id='shop-name']"),
    ],
    rating: vec![
        Rule::text(".rating"),
        Rule::text("[data-test-id='rating']"),
    ],
    review_count: vec![
        Rule::text(".review-count"),
        Rule::text("[data-test-id='review-count']"),
    ],
    favorites: vec![
        Rule::text(".favorite-count"),
        Rule::text("[data-test-id='favorite-count']"),
    ],
    location: vec![
        Rule::text(".shop-location"),
        Rule::text("[data-test-id='shop-location']"),
    ],
    shipping: vec![
        Rule::text(".shipping-info"),
        Rule::text("[data-test-id='shipping-info']"),
    ],
});

/// Joins the trimmed, non-empty text nodes under `el` with single spaces.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_match(rules: &[Rule], card: ElementRef<'_>) -> String {
    rules
        .iter()
        .find_map(|rule| rule.apply(card))
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct CardExtractor {
    origin: Url,
}

impl CardExtractor {
    /// Creates an extractor resolving relative hrefs against `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if `origin` is not an absolute
    /// http(s) URL.
    pub fn new(origin: &str) -> Result<Self, ScraperError> {
        let origin = parse_http_url(origin).map_err(|reason| ScraperError::InvalidUrl {
            url: origin.to_owned(),
            reason,
        })?;
        Ok(Self { origin })
    }

    /// Extracts every identifiable listing card from a fetched page.
    #[must_use]
    pub fn extract(&self, document: &Document) -> Vec<ProductRecord> {
        let html = document.parse();
        let records = self.extract_html(&html);
        tracing::debug!(url = document.url(), records = records.len(), "extracted cards");
        records
    }

    /// Extracts every identifiable listing card from a parsed tree.
    #[must_use]
    pub fn extract_html(&self, html: &Html) -> Vec<ProductRecord> {
        let Some((css, cards)) = CARD_SELECTORS.iter().find_map(|(css, sel)| {
            let cards: Vec<ElementRef<'_>> = html.select(sel).collect();
            (!cards.is_empty()).then_some((*css, cards))
        }) else {
            tracing::debug!("no card selector matched");
            return Vec::new();
        };
        tracing::debug!(selector = css, cards = cards.len(), "card selector matched");

        cards
            .into_iter()
            .map(|card| self.extract_card(card))
            .filter(ProductRecord::is_identifiable)
            .collect()
    }

    fn extract_card(&self, card: ElementRef<'_>) -> ProductRecord {
        let rules = &*FIELD_RULES;
        let href = first_match(&rules.url, card);
        let url = absolutize(&self.origin, &href).unwrap_or_default();

        ProductRecord {
            title: first_match(&rules.title, card),
            price: first_match(&rules.price, card),
            url,
            image_url: first_match(&rules.image_url, card),
            seller: first_match(&rules.seller, card),
            rating: first_match(&rules.rating, card),
            review_count: first_match(&rules.review_count, card),
            favorites: first_match(&rules.favorites, card),
            location: first_match(&rules.location, card),
            shipping: first_match(&rules.shipping, card),
            ..ProductRecord::default()
        }
    }
}

impl Default for CardExtractor {
    fn default() -> Self {
        Self {
            origin: Url::parse(DEFAULT_MARKETPLACE_ORIGIN).expect("valid origin"),
        }
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
