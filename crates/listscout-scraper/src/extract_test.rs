use super::*;

fn extract(html: &str) -> Vec<ProductRecord> {
    CardExtractor::default().extract(&Document::new("https://www.etsy.com/search?q=art", html))
}

const FULL_CARD: &str = r#"
<ul>
  <li class="wt-list-unstyled" data-listing-id="101">
    <a href="/listing/101/botanical-print">
      <img src="https://i.etsystatic.com/101.jpg" />
      <h3> Botanical   Print
      </h3>
    </a>
    <span class="currency-value">24.99</span>
    <p class="shop-name">GreenLeafStudio</p>
    <span class="rating">4.8</span>
    <span class="review-count">(1,204)</span>
    <span class="favorite-count">310</span>
    <span class="shop-location">Portland, OR</span>
    <span class="shipping-info">Free shipping</span>
  </li>
</ul>
"#;

#[test]
fn extracts_every_field_from_a_full_card() {
    let records = extract(FULL_CARD);
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.title, "Botanical Print");
    assert_eq!(r.price, "24.99");
    assert_eq!(r.url, "https://www.etsy.com/listing/101/botanical-print");
    assert_eq!(r.image_url, "https://i.etsystatic.com/101.jpg");
    assert_eq!(r.seller, "GreenLeafStudio");
    assert_eq!(r.rating, "4.8");
    assert_eq!(r.review_count, "(1,204)");
    assert_eq!(r.favorites, "310");
    assert_eq!(r.location, "Portland, OR");
    assert_eq!(r.shipping, "Free shipping");
    assert!(r.tags.is_empty());
    assert!(r.description.is_empty());
}

#[test]
fn minimal_card_leaves_other_fields_empty() {
    let records = extract(
        r#"<ul><li data-listing-id="7"><a href="https://www.etsy.com/listing/7">x</a><h3>Mug</h3></li></ul>"#,
    );
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.title, "Mug");
    assert_eq!(r.url, "https://www.etsy.com/listing/7");
    assert_eq!(
        ProductRecord {
            title: String::new(),
            url: String::new(),
            ..r.clone()
        },
        ProductRecord::default()
    );
}

#[test]
fn no_matching_card_selector_yields_nothing() {
    assert!(extract("<div class='grid'><p>No results</p></div>").is_empty());
    assert!(extract("").is_empty());
}

#[test]
fn cards_without_title_or_url_are_dropped() {
    let html = r#"
      <div class="listing-card"><span class="currency-value">5.00</span></div>
      <div class="listing-card"><h3>Keeper</h3></div>
    "#;
    let records = extract(html);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Keeper");
}

#[test]
fn first_matching_card_selector_wins_for_whole_document() {
    // `.listing-card` would match both elements, but the higher-priority
    // `li[data-listing-id]` matches one and is used exclusively.
    let html = r#"
      <ul><li data-listing-id="1" class="listing-card"><h3>Preferred</h3></li></ul>
      <div class="listing-card"><h3>Ignored</h3></div>
    "#;
    let records = extract(html);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Preferred");
}

#[test]
fn field_fallback_uses_later_selectors() {
    let html = r#"
      <div data-test-id="listing-card">
        <span data-test-id="listing-card-title">Fallback Title</span>
        <span data-test-id="price">12.00</span>
        <span data-test-id="shop-name">ShopTwo</span>
      </div>
    "#;
    let records = extract(html);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Fallback Title");
    assert_eq!(records[0].price, "12.00");
    assert_eq!(records[0].seller, "ShopTwo");
}

#[test]
fn empty_primary_match_falls_through_to_next_rule() {
    let html = r#"<li data-logger-id="x"><h3>   </h3><p class="wt-text-truncate">Real Title</p></li>"#;
    let records = extract(html);
    assert_eq!(records[0].title, "Real Title");
}

#[test]
fn image_falls_back_to_data_src() {
    let html = r#"<li data-listing-id="9"><h3>Lazy</h3><img data-src="https://img/lazy.jpg"></li>"#;
    let records = extract(html);
    assert_eq!(records[0].image_url, "https://img/lazy.jpg");
}

#[test]
fn relative_hrefs_resolve_against_custom_origin() {
    let extractor = CardExtractor::new("http://127.0.0.1:8080").expect("valid origin");
    let records = extractor.extract(&Document::new(
        "http://127.0.0.1:8080/search",
        r#"<li data-listing-id="3"><a href="/listing/3">Three</a></li>"#,
    ));
    assert_eq!(records[0].url, "http://127.0.0.1:8080/listing/3");
    assert!(records[0].title.is_empty());
}

#[test]
fn rejects_non_http_origin() {
    let err = CardExtractor::new("ftp://example.com").unwrap_err();
    assert!(matches!(err, ScraperError::InvalidUrl { .. }));
    assert!(CardExtractor::new("not a url").is_err());
}

#[test]
fn extracts_many_cards_in_document_order() {
    let html: String = (1..=3)
        .map(|i| {
            format!(r#"<li class="wt-list-unstyled"><a href="/listing/{i}"><h3>Item {i}</h3></a></li>"#)
        })
        .collect();
    let titles: Vec<String> = extract(&format!("<ul>{html}</ul>"))
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert_eq!(titles, vec!["Item 1", "Item 2", "Item 3"]);
}
