//! Stable key derivation
//!
//! Search providers are inconsistent about which identifying fields they
//! return, so every lookup goes through an ordered list of extractor
//! functions and the first one that produces a value wins. The lists are
//! public so the precedence can be inspected and tested on its own.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Pulls one candidate value out of an entity payload
pub type FieldExtractor = fn(&Value) -> Option<String>;

/// Primary identifier precedence
pub const PRIMARY_ID_EXTRACTORS: &[FieldExtractor] = &[product_id, plain_id];

/// Secondary (UPC-like) identifier precedence
pub const SECONDARY_ID_EXTRACTORS: &[FieldExtractor] = &[upc, gtin, first_item_upc];

/// Description precedence, normalized before use as a key
pub const DESCRIPTION_EXTRACTORS: &[FieldExtractor] = &[description, name];

/// Returns the first value produced by `extractors`, tried in order
pub fn first_match(extractors: &[FieldExtractor], value: &Value) -> Option<String> {
    extractors.iter().find_map(|extract| extract(value))
}

/// Deterministic identity used to deduplicate entities across queries
///
/// Each variant is its own namespace: a synthetic key can never equal a
/// key derived from a real identifier, even if the strings coincide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum StableKey {
    Primary(String),
    Secondary(String),
    Description(String),
    Synthetic(String),
}

impl StableKey {
    /// Derives the key for a payload: primary id, secondary id, normalized
    /// description, then a content hash
    pub fn derive(value: &Value) -> Self {
        if let Some(id) = first_match(PRIMARY_ID_EXTRACTORS, value) {
            return Self::Primary(id);
        }
        if let Some(code) = first_match(SECONDARY_ID_EXTRACTORS, value) {
            return Self::Secondary(code);
        }
        if let Some(desc) =
            first_match(DESCRIPTION_EXTRACTORS, value).and_then(|d| normalize_description(&d))
        {
            return Self::Description(desc);
        }
        Self::Synthetic(content_hash(value))
    }

    /// Returns true if no identifying field was found
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Synthetic(_))
    }
}

impl fmt::Display for StableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary(v) => write!(f, "id:{}", v),
            Self::Secondary(v) => write!(f, "code:{}", v),
            Self::Description(v) => write!(f, "desc:{}", v),
            Self::Synthetic(v) => write!(f, "synthetic:{}", v),
        }
    }
}

/// Lowercases and collapses whitespace; `None` if nothing is left
pub fn normalize_description(raw: &str) -> Option<String> {
    let normalized = raw
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn content_hash(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Reads a non-empty string or number field
fn scalar_field(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn product_id(value: &Value) -> Option<String> {
    scalar_field(value, "productId")
}

fn plain_id(value: &Value) -> Option<String> {
    scalar_field(value, "id")
}

fn upc(value: &Value) -> Option<String> {
    scalar_field(value, "upc")
}

fn gtin(value: &Value) -> Option<String> {
    scalar_field(value, "gtin")
}

fn first_item_upc(value: &Value) -> Option<String> {
    value
        .get("items")?
        .as_array()?
        .iter()
        .find_map(|item| scalar_field(item, "upc").or_else(|| scalar_field(item, "itemId")))
}

fn description(value: &Value) -> Option<String> {
    scalar_field(value, "description")
}

fn name(value: &Value) -> Option<String> {
    scalar_field(value, "name")
}
