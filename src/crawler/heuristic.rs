//! Expansion heuristic
//!
//! Providers silently truncate result sets, so the first page is the only
//! signal available before paging runs out. A first page holding at least
//! `threshold` entities, or a reported total above the page size, marks the
//! query as broad. The threshold sits below the page size to catch providers
//! that cap the reported total at exactly one page.

use crate::provider::PageResult;

/// What the first page says about a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstPageVerdict {
    /// Nothing came back; the query is exhausted and never expands
    Empty,

    /// The result set looks fully enumerable
    Narrow,

    /// The result set is probably truncated and should be subdivided
    Broad,
}

impl FirstPageVerdict {
    pub fn is_broad(&self) -> bool {
        matches!(self, Self::Broad)
    }
}

/// Classifies first pages against a page size and threshold
#[derive(Debug, Clone, Copy)]
pub struct ExpansionHeuristic {
    page_size: u32,
    threshold: u32,
}

impl ExpansionHeuristic {
    /// `threshold` must not exceed `page_size`; config validation enforces this
    pub fn new(page_size: u32, threshold: u32) -> Self {
        Self {
            page_size,
            threshold,
        }
    }

    /// Classifies a query from its first page
    pub fn classify(&self, first_page: &PageResult) -> FirstPageVerdict {
        let count = first_page.len() as u64;
        if count == 0 {
            return FirstPageVerdict::Empty;
        }

        if self.is_ambiguous_total(first_page.reported_total) {
            tracing::debug!(
                "Reported total equals page size ({}); relying on entity count",
                self.page_size
            );
        }

        let page_is_full_enough = count >= u64::from(self.threshold);
        let total_exceeds_page = first_page
            .reported_total
            .is_some_and(|total| total > u64::from(self.page_size));

        if page_is_full_enough || total_exceeds_page {
            FirstPageVerdict::Broad
        } else {
            FirstPageVerdict::Narrow
        }
    }

    /// A total of exactly one page may be the provider's cap rather than the truth
    pub fn is_ambiguous_total(&self, reported_total: Option<u64>) -> bool {
        reported_total == Some(u64::from(self.page_size))
    }
}
