//! External search provider seam
//!
//! The crawl engine and the lookup pool only ever talk to a
//! [`SearchProvider`]. The HTTP implementation lives in [`http`]; tests
//! substitute scripted providers.

pub mod credentials;
mod http;
#[cfg(test)]
pub(crate) mod testing;

pub use credentials::{AccessToken, CachedCredentials, CredentialProvider, StaticCredentials, TokenSource};
pub use http::{build_http_client, parse_search_response, HttpSearchProvider};

use crate::entity::Entity;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a search call
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Credential error: {0}")]
    Credentials(String),
}

impl TransportError {
    /// Returns true for failures worth retrying (429, 5xx, timeouts, network)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout | Self::Network(_) => true,
            Self::Decode(_) | Self::Credentials(_) => false,
        }
    }
}

/// One search call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Keyword, prefix or identifier being searched
    pub term: String,

    /// Store/location context
    pub location_id: String,

    /// Entities requested
    pub page_size: u32,

    /// 1-based offset of the first entity on the page
    pub cursor: u32,
}

impl SearchRequest {
    pub fn new(
        term: impl Into<String>,
        location_id: impl Into<String>,
        page_size: u32,
        cursor: u32,
    ) -> Self {
        Self {
            term: term.into(),
            location_id: location_id.into(),
            page_size,
            cursor,
        }
    }
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    pub entities: Vec<Entity>,

    /// Total the provider claims to have; may be capped or missing
    pub reported_total: Option<u64>,
}

impl PageResult {
    pub fn new(entities: Vec<Entity>, reported_total: Option<u64>) -> Self {
        Self {
            entities,
            reported_total,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// The external search API as the engine sees it
///
/// Implementations own transport concerns (auth, retries, timeouts). A
/// lookup is the same call with an identifier as the term.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<PageResult, TransportError>;
}
