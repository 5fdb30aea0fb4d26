//! Crawl orchestrator - the adaptive query-space crawl loop
//!
//! This module drives a crawl from seed queries to a final report:
//! - Pulling query nodes from the frontier in FIFO order
//! - Paging each query until it is exhausted or capped
//! - Deduplicating entities across overlapping queries
//! - Expanding broad queries into longer child queries
//! - Honoring cancellation and the per-node failure policy

use crate::config::{validate_crawl_config, CrawlConfig, FailurePolicy};
use crate::crawler::fetcher::{cursor_for_page, PageFetcher};
use crate::crawler::frontier::{Frontier, QueryNode};
use crate::crawler::heuristic::{ExpansionHeuristic, FirstPageVerdict};
use crate::crawler::metrics::{CrawlReport, FailedNode, MetricsAggregator, NodeMetrics};
use crate::crawler::NodeState;
use crate::entity::Deduplicator;
use crate::provider::{PageResult, SearchProvider, TransportError};
use crate::{Result, SweepError};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Emitted after every fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageProgress {
    pub query: String,
    pub depth: u32,
    /// 1-based page number within the query
    pub page: u32,
}

/// Callback invoked with per-page progress
pub type ProgressCallback = Arc<dyn Fn(&PageProgress) + Send + Sync>;

/// Optional hooks for a crawl
#[derive(Clone, Default)]
pub struct CrawlOptions {
    progress: Option<ProgressCallback>,
    cancel: Option<CancellationToken>,
}

impl CrawlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-page progress callback
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Sets a token that stops the crawl between pages
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    fn report(&self, progress: PageProgress) {
        if let Some(callback) = &self.progress {
            callback(&progress);
        }
    }
}

/// Running tally for the node being paged
#[derive(Default)]
struct NodeTally {
    api_calls: u32,
    pages_fetched: u32,
    reported_total: Option<u64>,
    seen: Deduplicator,
    items: u64,
    verdict: Option<FirstPageVerdict>,
}

/// How paging a node ended
enum PagingEnd {
    Exhausted,
    Capped,
    Cancelled,
    Failed { page: u32, source: TransportError },
}

/// Owns all per-crawl state; nothing outlives [`Orchestrator::run`]
pub struct Orchestrator<'a> {
    config: &'a CrawlConfig,
    fetcher: PageFetcher<'a>,
    heuristic: ExpansionHeuristic,
    alphabet: Vec<char>,
    frontier: Frontier,
    dedup: Deduplicator,
    metrics: MetricsAggregator,
    options: CrawlOptions,
    cancelled: bool,
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator, rejecting invalid configuration before any call is made
    pub fn new(
        provider: &'a dyn SearchProvider,
        config: &'a CrawlConfig,
        options: CrawlOptions,
    ) -> Result<Self> {
        validate_crawl_config(config)?;

        Ok(Self {
            config,
            fetcher: PageFetcher::new(provider, &config.location_id, config.page_size),
            heuristic: ExpansionHeuristic::new(config.page_size, config.expansion_threshold),
            alphabet: config.alphabet(),
            frontier: Frontier::seeded(&config.seeds, config.max_nodes),
            dedup: Deduplicator::new(),
            metrics: MetricsAggregator::new(),
            options,
            cancelled: false,
        })
    }

    /// Runs the crawl loop until the frontier drains or the crawl is cancelled
    pub async fn run(mut self) -> Result<CrawlReport> {
        tracing::info!(
            "Starting crawl: {} seeds, page size {}, threshold {}, max depth {} (at most {} nodes)",
            self.frontier.created(),
            self.config.page_size,
            self.config.expansion_threshold,
            self.config.max_depth,
            self.config.worst_case_nodes()
        );

        let start_time = Instant::now();
        let mut nodes_processed = 0usize;

        loop {
            if self.options.is_cancelled() {
                tracing::info!("Crawl cancelled with {} nodes pending", self.frontier.pending());
                self.cancelled = true;
                break;
            }

            let id = match self.frontier.pop() {
                Some(id) => id,
                None => {
                    tracing::info!("Frontier is empty, crawl complete");
                    break;
                }
            };

            let node = self.frontier.get(id).clone();
            tracing::debug!("Processing query '{}' at depth {}", node.query, node.depth);
            self.process_node(&node).await?;
            nodes_processed += 1;

            if nodes_processed % 10 == 0 {
                tracing::info!(
                    "Progress: {} nodes processed, {} in frontier, {} unique entities",
                    nodes_processed,
                    self.frontier.pending(),
                    self.dedup.len()
                );
            }
        }

        let report = self.metrics.finish(
            self.dedup.len(),
            self.cancelled,
            self.frontier.cap_reached(),
        );

        tracing::info!(
            "Crawl finished: {} nodes, {} API calls, {} unique entities in {:?}",
            report.total_nodes,
            report.total_api_calls,
            report.total_unique_entities,
            start_time.elapsed()
        );

        Ok(report)
    }

    /// Processes one node: skip or page it, then decide on expansion
    async fn process_node(&mut self, node: &QueryNode) -> Result<()> {
        let state = NodeState::Queued;

        let too_short = node.query.chars().count() < self.config.min_term_length;
        if too_short && node.depth < self.config.max_depth {
            let state = state.transition(NodeState::Skipped)?;
            tracing::debug!(
                "Query '{}' is shorter than {} characters, expanding without searching",
                node.query,
                self.config.min_term_length
            );
            let expanded = self.expand(node, state)?;
            self.metrics
                .record(node_metrics(node, NodeTally::default(), expanded, state, None));
            return Ok(());
        }

        let state = state.transition(NodeState::Paging)?;
        let mut tally = NodeTally::default();

        match self.page_through(node, &mut tally).await {
            PagingEnd::Exhausted => {
                let state = state.transition(NodeState::Exhausted)?;
                self.finish_paged_node(node, tally, state)
            }
            PagingEnd::Capped => {
                let state = state.transition(NodeState::Capped)?;
                tracing::debug!(
                    "Query '{}' hit the page cap ({} pages)",
                    node.query,
                    self.config.max_pages
                );
                self.finish_paged_node(node, tally, state)
            }
            PagingEnd::Cancelled => {
                let state = state.transition(NodeState::Cancelled)?;
                self.cancelled = true;
                self.metrics
                    .record(node_metrics(node, tally, false, state, None));
                Ok(())
            }
            PagingEnd::Failed { page, source } => {
                let state = state.transition(NodeState::Failed)?;
                self.handle_failure(node, tally, state, page, source)
            }
        }
    }

    /// Fetches pages until a short page, the page cap, cancellation or a failure
    async fn page_through(&mut self, node: &QueryNode, tally: &mut NodeTally) -> PagingEnd {
        let page_size = self.fetcher.page_size();
        let mut page_number = 0u32;

        loop {
            if page_number >= self.config.max_pages {
                return PagingEnd::Capped;
            }
            if self.options.is_cancelled() {
                return PagingEnd::Cancelled;
            }

            page_number += 1;
            let cursor = cursor_for_page(page_number, page_size);
            tally.api_calls += 1;

            let page = match self.fetcher.fetch_page(&node.query, cursor).await {
                Ok(page) => page,
                Err(source) => {
                    return PagingEnd::Failed {
                        page: page_number,
                        source,
                    }
                }
            };
            tally.pages_fetched += 1;

            if page_number == 1 {
                tally.reported_total = page.reported_total;
                tally.verdict = Some(self.heuristic.classify(&page));
            }

            let count = page.len();
            self.absorb(page, tally);

            tracing::debug!(
                "Query '{}' page {}: {} entities ({} unique so far)",
                node.query,
                page_number,
                count,
                self.dedup.len()
            );
            self.options.report(PageProgress {
                query: node.query.clone(),
                depth: node.depth,
                page: page_number,
            });

            if (count as u64) < u64::from(page_size) {
                return PagingEnd::Exhausted;
            }
        }
    }

    /// Merges a page into the crawl-wide and per-node dedup sets
    fn absorb(&mut self, page: PageResult, tally: &mut NodeTally) {
        for entity in page.entities {
            let key = entity.stable_key();
            tally.items += entity.item_count() as u64;
            tally.seen.insert(key.clone());
            self.dedup.insert(key);
        }
    }

    fn finish_paged_node(
        &mut self,
        node: &QueryNode,
        tally: NodeTally,
        state: NodeState,
    ) -> Result<()> {
        let broad = tally.verdict.is_some_and(|v| v.is_broad());
        let expanded = if broad && node.depth < self.config.max_depth {
            self.expand(node, state)?
        } else {
            if broad {
                tracing::debug!(
                    "Query '{}' looks truncated but is already at max depth {}",
                    node.query,
                    self.config.max_depth
                );
            }
            state.transition(NodeState::Done)?;
            false
        };

        self.metrics
            .record(node_metrics(node, tally, expanded, state, None));
        Ok(())
    }

    /// Enqueues one child per alphabet symbol, returning whether any was admitted
    fn expand(&mut self, node: &QueryNode, state: NodeState) -> Result<bool> {
        let admitted = self.frontier.push_children(node, &self.alphabet);
        if admitted > 0 {
            state
                .transition(NodeState::Expanded)?
                .transition(NodeState::Done)?;
            tracing::debug!(
                "Expanded '{}' into {} children at depth {}",
                node.query,
                admitted,
                node.depth + 1
            );
        } else {
            state.transition(NodeState::Done)?;
        }
        Ok(admitted > 0)
    }

    fn handle_failure(
        &mut self,
        node: &QueryNode,
        tally: NodeTally,
        state: NodeState,
        page: u32,
        source: TransportError,
    ) -> Result<()> {
        match self.config.on_node_failure {
            FailurePolicy::Abort => {
                tracing::error!(
                    "Search failed for '{}' (depth {}, page {}): {}",
                    node.query,
                    node.depth,
                    page,
                    source
                );
                Err(SweepError::Transport {
                    query: node.query.clone(),
                    depth: node.depth,
                    page,
                    source,
                })
            }
            FailurePolicy::Continue => {
                tracing::warn!(
                    "Abandoning query '{}' (depth {}, page {}): {}",
                    node.query,
                    node.depth,
                    page,
                    source
                );
                let message = source.to_string();
                self.metrics.record_failure(FailedNode {
                    query: node.query.clone(),
                    depth: node.depth,
                    page,
                    message: message.clone(),
                });
                self.metrics
                    .record(node_metrics(node, tally, false, state, Some(message)));
                Ok(())
            }
        }
    }
}

fn node_metrics(
    node: &QueryNode,
    tally: NodeTally,
    expanded: bool,
    outcome: NodeState,
    error: Option<String>,
) -> NodeMetrics {
    NodeMetrics {
        query: node.query.clone(),
        depth: node.depth,
        api_calls: tally.api_calls,
        pages_fetched: tally.pages_fetched,
        reported_total: tally.reported_total,
        unique_entities_at_node: tally.seen.len(),
        items_discovered: tally.items,
        expanded,
        outcome,
        error,
    }
}

/// Runs a complete crawl against `provider`
///
/// Configuration is validated before the first search call. With the
/// default `abort` failure policy the first transport error ends the crawl;
/// cancellation returns the partial report with `cancelled` set.
///
/// # Example
///
/// ```no_run
/// use catalog_sweep::config::CrawlConfig;
/// use catalog_sweep::{crawl, CrawlOptions, SearchProvider};
///
/// # async fn example(provider: &dyn SearchProvider) -> catalog_sweep::Result<()> {
/// let config = CrawlConfig::new(vec!["milk".into()], "01400943", 50, 45, 2);
/// let report = crawl(provider, &config, CrawlOptions::default()).await?;
/// println!("{} unique products", report.total_unique_entities);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(
    provider: &dyn SearchProvider,
    config: &CrawlConfig,
    options: CrawlOptions,
) -> Result<CrawlReport> {
    Orchestrator::new(provider, config, options)?.run().await
}
