//! Crawl metrics
//!
//! One [`NodeMetrics`] per processed node, folded into a [`CrawlReport`]
//! when the frontier drains.

use crate::crawler::NodeState;
use serde::Serialize;

/// Counters for one processed query node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMetrics {
    pub query: String,
    pub depth: u32,

    /// Search calls made, including a failed one
    pub api_calls: u32,

    /// Pages successfully fetched
    pub pages_fetched: u32,

    /// Total reported on the first page, if any
    pub reported_total: Option<u64>,

    /// Distinct entities this node saw (overlap with other nodes included)
    pub unique_entities_at_node: usize,

    /// Sub-items tallied across every page of this node
    pub items_discovered: u64,

    pub expanded: bool,

    /// How paging ended
    pub outcome: NodeState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A node abandoned after a fetch failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedNode {
    pub query: String,
    pub depth: u32,
    pub page: u32,
    pub message: String,
}

/// Final report of one crawl
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlReport {
    pub total_api_calls: u64,
    pub total_pages: u64,
    pub total_nodes: usize,

    /// Deduplicator cardinality at the end of the crawl
    pub total_unique_entities: usize,

    /// Sum of `items_discovered` over all nodes
    pub total_items: u64,

    /// Deepest depth among processed nodes
    pub depth_reached: u32,

    /// Nodes in processing order
    pub nodes: Vec<NodeMetrics>,

    pub failed_nodes: Vec<FailedNode>,
    pub cancelled: bool,
    pub node_cap_reached: bool,
}

impl CrawlReport {
    /// Number of nodes that enqueued children
    pub fn expanded_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.expanded).count()
    }

    /// Number of nodes whose paging hit the page cap
    pub fn capped_nodes(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.outcome == NodeState::Capped)
            .count()
    }

    /// Looks up a node's metrics by query
    pub fn node(&self, query: &str) -> Option<&NodeMetrics> {
        self.nodes.iter().find(|n| n.query == query)
    }
}

/// Accumulates node metrics in processing order
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    nodes: Vec<NodeMetrics>,
    failed: Vec<FailedNode>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, metrics: NodeMetrics) {
        self.nodes.push(metrics);
    }

    pub fn record_failure(&mut self, failure: FailedNode) {
        self.failed.push(failure);
    }

    /// Folds everything recorded into the final report
    ///
    /// `unique_entities` comes from the deduplicator: summing per-node
    /// counts would double count entities returned by overlapping queries.
    pub fn finish(
        self,
        unique_entities: usize,
        cancelled: bool,
        node_cap_reached: bool,
    ) -> CrawlReport {
        let total_api_calls = self.nodes.iter().map(|n| u64::from(n.api_calls)).sum();
        let total_pages = self.nodes.iter().map(|n| u64::from(n.pages_fetched)).sum();
        let total_items = self.nodes.iter().map(|n| n.items_discovered).sum();
        let depth_reached = self.nodes.iter().map(|n| n.depth).max().unwrap_or(0);

        CrawlReport {
            total_api_calls,
            total_pages,
            total_nodes: self.nodes.len(),
            total_unique_entities: unique_entities,
            total_items,
            depth_reached,
            nodes: self.nodes,
            failed_nodes: self.failed,
            cancelled,
            node_cap_reached,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(query: &str, depth: u32, api_calls: u32, items: u64) -> NodeMetrics {
        NodeMetrics {
            query: query.to_string(),
            depth,
            api_calls,
            pages_fetched: api_calls,
            reported_total: None,
            unique_entities_at_node: items as usize,
            items_discovered: items,
            expanded: false,
            outcome: NodeState::Exhausted,
            error: None,
        }
    }

    #[test]
    fn test_finish_sums_counters() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.record(node("a", 0, 2, 13));
        aggregator.record(node("b", 0, 1, 2));
        aggregator.record(node("a0", 1, 1, 4));

        let report = aggregator.finish(15, false, false);
        assert_eq!(report.total_api_calls, 4);
        assert_eq!(report.total_pages, 4);
        assert_eq!(report.total_nodes, 3);
        assert_eq!(report.total_items, 19);
        assert_eq!(report.total_unique_entities, 15);
        assert_eq!(report.depth_reached, 1);
        assert_eq!(report.nodes[2].query, "a0");
    }

    #[test]
    fn test_empty_report() {
        let report = MetricsAggregator::new().finish(0, true, false);
        assert_eq!(report.total_nodes, 0);
        assert_eq!(report.depth_reached, 0);
        assert!(report.cancelled);
    }

    #[test]
    fn test_report_queries() {
        let mut aggregator = MetricsAggregator::new();
        let mut capped = node("a", 0, 5, 50);
        capped.outcome = NodeState::Capped;
        capped.expanded = true;
        aggregator.record(capped);
        aggregator.record(node("b", 0, 1, 1));

        let report = aggregator.finish(51, false, false);
        assert_eq!(report.capped_nodes(), 1);
        assert_eq!(report.expanded_nodes(), 1);
        assert_eq!(report.node("b").map(|n| n.api_calls), Some(1));
        assert!(report.node("zz").is_none());
    }

    #[test]
    fn test_report_serializes() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.record(node("a", 0, 1, 1));
        let json = serde_json::to_value(aggregator.finish(1, false, false)).unwrap();

        assert_eq!(json["total_api_calls"], 1);
        assert_eq!(json["nodes"][0]["outcome"], "exhausted");
        assert!(json["nodes"][0].get("error").is_none());
    }
}
