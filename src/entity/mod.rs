//! Entities returned by the search provider
//!
//! The engine treats an entity as an opaque JSON payload. It only needs to
//! know how to key it for deduplication, which identifiers it carries for
//! lookup matching, and how many sub-items it lists.

mod dedup;
pub mod key;

pub use dedup::Deduplicator;
pub use key::StableKey;

use key::{first_match, PRIMARY_ID_EXTRACTORS, SECONDARY_ID_EXTRACTORS};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A discovered record, carrying whatever fields the API returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Value);

impl Entity {
    pub fn new(payload: Value) -> Self {
        Self(payload)
    }

    pub fn primary_id(&self) -> Option<String> {
        first_match(PRIMARY_ID_EXTRACTORS, &self.0)
    }

    pub fn secondary_id(&self) -> Option<String> {
        first_match(SECONDARY_ID_EXTRACTORS, &self.0)
    }

    pub fn stable_key(&self) -> StableKey {
        StableKey::derive(&self.0)
    }

    /// Returns true if the primary or secondary identifier equals `id`
    pub fn matches_id(&self, id: &str) -> bool {
        let id = id.trim();
        self.primary_id().as_deref() == Some(id) || self.secondary_id().as_deref() == Some(id)
    }

    /// Number of sub-items (sizes, variants) this entity lists
    ///
    /// An entity without an `items` array still counts as one item.
    pub fn item_count(&self) -> usize {
        self.0
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.len())
            .filter(|&n| n > 0)
            .unwrap_or(1)
    }
}

impl From<Value> for Entity {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
