//! Crawl engine
//!
//! This module contains the adaptive query-space crawl, including:
//! - Paging a query through the search provider
//! - Judging from its first page whether a query is truncated
//! - Breadth-first expansion of broad queries over an alphabet
//! - Per-node metrics and the final crawl report

mod fetcher;
mod frontier;
mod heuristic;
mod metrics;
mod orchestrator;
mod state;

pub use fetcher::{cursor_for_page, PageFetcher};
pub use frontier::{Frontier, NodeId, QueryNode};
pub use heuristic::{ExpansionHeuristic, FirstPageVerdict};
pub use metrics::{CrawlReport, FailedNode, MetricsAggregator, NodeMetrics};
pub use orchestrator::{crawl, CrawlOptions, Orchestrator, PageProgress, ProgressCallback};
pub use state::NodeState;
