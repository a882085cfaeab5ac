//! JSON rendering of scrape results.

use std::path::Path;

use anyhow::Context;
use listscout_core::ProductRecord;
use serde::Serialize;

/// A record as written to the output, with the parsed price attached when
/// cleaning was requested.
#[derive(Debug, Serialize)]
pub(crate) struct OutputRecord {
    #[serde(flatten)]
    pub record: ProductRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_value: Option<f64>,
}

pub(crate) fn prepare(records: Vec<ProductRecord>, clean: bool) -> Vec<OutputRecord> {
    if !clean {
        return records
            .into_iter()
            .map(|record| OutputRecord {
                record,
                price_value: None,
            })
            .collect();
    }

    listscout_scraper::clean_records(records)
        .into_iter()
        .map(|record| OutputRecord {
            price_value: listscout_scraper::parse_price(&record.price),
            record,
        })
        .collect()
}

/// Writes `value` as pretty JSON to `path`, or to stdout when `None`.
pub(crate) fn write_json<T: Serialize + ?Sized>(
    value: &T,
    path: Option<&Path>,
) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize results")?;
    match path {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote results");
        }
        None => println!("{json}"),
    }
    Ok(())
}
