//! Shared Socrata SODA API fetcher.
//!
//! Handles paginated fetching from any Socrata point dataset using the
//! `$limit`, `$offset`, `$order`, and `$where` query parameters. The
//! year restriction and any per-source category filter are combined into
//! a single server-side `$where` so only relevant rows cross the wire.

use std::fmt::Write as _;
use std::path::PathBuf;

use crate::source_def::SourceDefinition;
use crate::{FetchOptions, SourceError};

/// Builds the `$where` expression for a source: the source's own filter
/// AND-ed with the calendar-year bounds, when a year is requested.
#[must_use]
pub fn build_where_clause(source: &SourceDefinition, year: Option<i32>) -> Option<String> {
    let mut fragments: Vec<String> = Vec::new();

    if let Some(clause) = &source.where_clause {
        fragments.push(clause.clone());
    }

    if let Some(year) = year {
        fragments.push(format!(
            "{col} >= '{year}-01-01T00:00:00' AND {col} < '{next}-01-01T00:00:00'",
            col = source.date_column,
            next = year + 1,
        ));
    }

    if fragments.is_empty() {
        None
    } else {
        Some(fragments.join(" AND "))
    }
}

/// Fetches all matching records from a Socrata dataset with pagination,
/// writes them to a JSON file under `options.output_dir`, and returns
/// the output path.
///
/// # Errors
///
/// Returns [`SourceError`] if HTTP requests or file I/O fail, or if the
/// dataset yields zero records.
pub async fn fetch_socrata(
    client: &reqwest::Client,
    source: &SourceDefinition,
    options: &FetchOptions,
) -> Result<PathBuf, SourceError> {
    let output_path = options
        .output_dir
        .join(source.output_filename(options.year));
    std::fs::create_dir_all(&options.output_dir)?;

    let where_clause = build_where_clause(source, options.year);
    let mut all_records: Vec<serde_json::Value> = Vec::new();
    let mut offset: u64 = 0;
    let fetch_limit = options.limit.unwrap_or(u64::MAX);

    loop {
        let remaining = fetch_limit.saturating_sub(offset);
        if remaining == 0 {
            break;
        }
        let page_limit = remaining.min(source.page_size);

        let mut url = format!(
            "{}?$limit={}&$offset={}&$order={} DESC",
            source.api_url, page_limit, offset, source.date_column
        );
        if let Some(clause) = &where_clause {
            write!(url, "&$where={clause}").unwrap();
        }

        log::info!(
            "Fetching {} data: offset={offset}, limit={page_limit}",
            source.id
        );
        let response = client.get(&url).send().await?;
        let records: Vec<serde_json::Value> = response.json().await?;

        let count = records.len() as u64;
        if count == 0 {
            break;
        }

        all_records.extend(records);
        offset += count;

        if count < page_limit {
            break;
        }
    }

    if all_records.is_empty() {
        return Err(SourceError::EmptyResult {
            source_id: source.id.clone(),
        });
    }

    log::info!(
        "Downloaded {} {} records total",
        all_records.len(),
        source.id
    );
    let json = serde_json::to_string(&all_records)?;
    std::fs::write(&output_path, json)?;

    Ok(output_path)
}
