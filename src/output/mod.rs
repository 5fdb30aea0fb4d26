//! Output module for crawl reports and summaries
//!
//! This module handles:
//! - Writing the crawl report (or lookup outcomes) as a JSON document
//! - Printing human-readable summaries to stdout

mod report;
mod summary;

pub use report::{write_report, ReportDocument};
pub use summary::{print_crawl_summary, print_lookup_summary};

use thiserror::Error;

/// Errors raised while writing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
