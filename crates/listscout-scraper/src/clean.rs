//! Post-scrape record cleanup, applied by consumers on request.
//!
//! The engines never call into this module; scraped records reach the
//! caller untouched.

use std::collections::HashSet;
use std::sync::LazyLock;

use listscout_core::ProductRecord;
use regex::Regex;

static NON_PRICE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.,]").expect("valid regex"));

/// Parses a display price such as `"$1,204.50"` or `"24,50 €"` into a
/// number.
///
/// Only digits, `.` and `,` are kept. Commas are thousands separators when
/// a `.` is present, when there are several of them, or when the only one is
/// followed by exactly three digits (`"$1,204"`). Otherwise the single comma
/// is a decimal point (`"24,50"`).
#[must_use]
pub fn parse_price(raw: &str) -> Option<f64> {
    let kept = NON_PRICE_CHARS.replace_all(raw, "");
    let normalized = if commas_group_thousands(&kept) {
        kept.replace(',', "")
    } else {
        kept.replace(',', ".")
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn commas_group_thousands(kept: &str) -> bool {
    if kept.contains('.') {
        return true;
    }
    let mut groups = kept.split(',').skip(1);
    match (groups.next(), groups.next()) {
        (Some(_), Some(_)) => true,
        (Some(tail), None) => tail.len() == 3,
        (None, _) => false,
    }
}

/// Trims title and url, drops records missing either, and keeps the first
/// record seen for each url.
#[must_use]
pub fn clean_records(records: Vec<ProductRecord>) -> Vec<ProductRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter_map(|mut record| {
            record.title = record.title.trim().to_owned();
            record.url = record.url.trim().to_owned();
            if record.title.is_empty() || record.url.is_empty() {
                return None;
            }
            seen.insert(record.url.clone()).then_some(record)
        })
        .collect()
}
