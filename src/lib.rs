//! Catalog-Sweep: adaptive query-space crawler
//!
//! This crate covers a product catalog that can only be searched, never listed,
//! by paging keyword/prefix queries and subdividing the ones whose result sets
//! look truncated. It also resolves harvested identifiers back to full records
//! through a bounded worker pool.

pub mod config;
pub mod crawler;
pub mod entity;
pub mod lookup;
pub mod output;
pub mod provider;

use thiserror::Error;

pub use provider::TransportError;

/// Main error type for Catalog-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Search failed for '{query}' (depth {depth}, page {page}): {source}")]
    Transport {
        query: String,
        depth: u32,
        page: u32,
        #[source]
        source: TransportError,
    },

    #[error("Invalid node state transition: {from} -> {to}")]
    InvalidTransition {
        from: crawler::NodeState,
        to: crawler::NodeState,
    },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Catalog-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, CrawlOptions, CrawlReport, NodeMetrics};
pub use entity::{Deduplicator, Entity, StableKey};
pub use lookup::{LookupOutcome, LookupPool, MatchKind};
pub use provider::{PageResult, SearchProvider, SearchRequest};
