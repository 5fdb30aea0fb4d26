//! Paged query fetcher
//!
//! Turns `(query, cursor)` into one search call. Cursors are 1-based page
//! start offsets; the caller advances them by the page size. Retry policy
//! belongs to the provider, not here.

use crate::provider::{PageResult, SearchProvider, SearchRequest, TransportError};

/// Cursor for a 1-based page number
pub fn cursor_for_page(page: u32, page_size: u32) -> u32 {
    page.saturating_sub(1)
        .saturating_mul(page_size)
        .saturating_add(1)
}

/// Fetches pages of one query against a provider
pub struct PageFetcher<'a> {
    provider: &'a dyn SearchProvider,
    location_id: &'a str,
    page_size: u32,
}

impl<'a> PageFetcher<'a> {
    pub fn new(provider: &'a dyn SearchProvider, location_id: &'a str, page_size: u32) -> Self {
        Self {
            provider,
            location_id,
            page_size,
        }
    }

    /// Fetches the page starting at `cursor`
    pub async fn fetch_page(&self, query: &str, cursor: u32) -> Result<PageResult, TransportError> {
        let request = SearchRequest::new(query, self.location_id, self.page_size, cursor);
        tracing::trace!("GET page: term='{}' start={}", query, cursor);
        self.provider.search(&request).await
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}
