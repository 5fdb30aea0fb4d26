//! Identifier harvesting
//!
//! Pulls product identifiers out of an HTML listing, or out of a plain
//! newline-separated id file.

use crate::ConfigError;
use scraper::{Html, Selector};
use std::collections::HashSet;

/// Reads `attribute` from every element matching `selector`
///
/// Values are trimmed; empty values are dropped and repeats are kept once,
/// in document order.
///
/// # Example
///
/// ```
/// use catalog_sweep::lookup::harvest_ids;
///
/// let html = r#"<ul><li data-product-id="0001">Milk</li><li data-product-id="0002">Eggs</li></ul>"#;
/// let ids = harvest_ids(html, "[data-product-id]", "data-product-id").unwrap();
/// assert_eq!(ids, vec!["0001", "0002"]);
/// ```
pub fn harvest_ids(html: &str, selector: &str, attribute: &str) -> Result<Vec<String>, ConfigError> {
    let selector = Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("{}: {:?}", selector, e)))?;
    let document = Html::parse_document(html);

    let values = document
        .select(&selector)
        .filter_map(|element| element.value().attr(attribute));
    Ok(dedupe_in_order(values))
}

/// Parses a newline-separated id list; blank lines and `#` comments are ignored
pub fn parse_id_list(content: &str) -> Vec<String> {
    dedupe_in_order(content.lines().filter(|line| !line.trim_start().starts_with('#')))
}

fn dedupe_in_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .filter(|value| seen.insert(value.to_string()))
        .map(str::to_string)
        .collect()
}
