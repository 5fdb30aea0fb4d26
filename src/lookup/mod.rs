//! Identifier lookups
//!
//! Resolves a list of identifiers to full records through a bounded pool of
//! workers sharing one search provider. Identifiers usually come from an
//! HTML listing ([`harvest_ids`]) or a plain id file ([`parse_id_list`]).

mod harvest;
mod pool;

pub use harvest::{harvest_ids, parse_id_list};
pub use pool::{classify, LookupPool};

use crate::entity::Entity;
use serde::Serialize;

/// How an identifier was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// A returned record carries the identifier
    Exact,
    /// Records came back but none carries the identifier; the first was taken
    Fuzzy,
    /// The search succeeded with no records
    Missing,
    /// The search failed
    Error,
}

/// Result of resolving one identifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupOutcome {
    pub id: String,
    pub record: Option<Entity>,
    pub match_kind: MatchKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LookupOutcome {
    pub fn exact(id: impl Into<String>, record: Entity) -> Self {
        Self {
            id: id.into(),
            record: Some(record),
            match_kind: MatchKind::Exact,
            message: None,
        }
    }

    pub fn fuzzy(id: impl Into<String>, record: Entity, candidates: usize) -> Self {
        Self {
            id: id.into(),
            record: Some(record),
            match_kind: MatchKind::Fuzzy,
            message: Some(format!("no exact match among {} records", candidates)),
        }
    }

    pub fn missing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            record: None,
            match_kind: MatchKind::Missing,
            message: None,
        }
    }

    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            record: None,
            match_kind: MatchKind::Error,
            message: Some(message.into()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.record.is_some()
    }
}
