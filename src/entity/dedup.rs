use crate::entity::StableKey;
use std::collections::HashSet;

/// Set of stable keys seen during one crawl
///
/// A key is recorded at most once, so `len()` is the unique entity count
/// no matter how many overlapping queries returned the same entity.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<StableKey>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a key, returning true if it had not been seen before
    pub fn insert(&mut self, key: StableKey) -> bool {
        self.seen.insert(key)
    }

    pub fn contains(&self, key: &StableKey) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
