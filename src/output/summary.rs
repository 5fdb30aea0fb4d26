//! Human-readable summaries printed at the end of a run

use crate::crawler::{CrawlReport, NodeState};
use crate::lookup::{LookupOutcome, MatchKind};
use std::collections::BTreeMap;

/// Prints a crawl report summary to stdout
pub fn print_crawl_summary(report: &CrawlReport) {
    println!("=== Crawl Summary ===\n");

    println!("Overview:");
    println!("  Query nodes processed: {}", report.total_nodes);
    println!("  API calls: {}", report.total_api_calls);
    println!("  Pages fetched: {}", report.total_pages);
    println!("  Unique entities: {}", report.total_unique_entities);
    println!("  Items discovered: {}", report.total_items);
    println!("  Deepest level reached: {}", report.depth_reached);
    println!();

    println!("Nodes by Outcome:");
    for (outcome, count) in outcome_counts(report) {
        let percentage = if report.total_nodes > 0 {
            (count as f64 / report.total_nodes as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", outcome, count, percentage);
    }
    println!("  expanded: {}", report.expanded_nodes());
    println!();

    if !report.failed_nodes.is_empty() {
        println!("Failed Queries ({}):", report.failed_nodes.len());
        for failed in &report.failed_nodes {
            println!(
                "  - '{}' (depth {}, page {}): {}",
                failed.query, failed.depth, failed.page, failed.message
            );
        }
        println!();
    }

    if report.node_cap_reached {
        println!("Warning: node cap reached, some child queries were never searched");
    }
    if report.cancelled {
        println!("Warning: crawl was cancelled, the report is partial");
    }

    let yield_per_call = if report.total_api_calls > 0 {
        report.total_unique_entities as f64 / report.total_api_calls as f64
    } else {
        0.0
    };
    println!(
        "Yield: {:.2} unique entities per API call ({} / {})",
        yield_per_call, report.total_unique_entities, report.total_api_calls
    );
}

/// Prints lookup outcomes grouped by match kind
pub fn print_lookup_summary(outcomes: &BTreeMap<String, LookupOutcome>) {
    println!("=== Lookup Summary ===\n");

    let resolved = resolved_count(outcomes);
    let percentage = if outcomes.is_empty() {
        0.0
    } else {
        (resolved as f64 / outcomes.len() as f64) * 100.0
    };
    println!("Identifiers: {}", outcomes.len());
    println!("  Resolved: {} ({:.1}%)", resolved, percentage);
    for kind in [
        MatchKind::Exact,
        MatchKind::Fuzzy,
        MatchKind::Missing,
        MatchKind::Error,
    ] {
        let count = outcomes.values().filter(|o| o.match_kind == kind).count();
        println!("  {:?}: {}", kind, count);
    }

    let errors: Vec<_> = outcomes
        .values()
        .filter(|o| o.match_kind == MatchKind::Error)
        .collect();
    if !errors.is_empty() {
        println!();
        println!("Errors:");
        for outcome in errors {
            println!(
                "  - {}: {}",
                outcome.id,
                outcome.message.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

/// Outcomes that came back with a record, exact or fuzzy
fn resolved_count(outcomes: &BTreeMap<String, LookupOutcome>) -> usize {
    outcomes.values().filter(|o| o.is_resolved()).count()
}

/// Node counts per outcome, most frequent first
fn outcome_counts(report: &CrawlReport) -> Vec<(NodeState, usize)> {
    let mut counts: BTreeMap<&'static str, (NodeState, usize)> = BTreeMap::new();
    for node in &report.nodes {
        counts.entry(node.outcome.as_str()).or_insert((node.outcome, 0)).1 += 1;
    }

    let mut counts: Vec<_> = counts.into_values().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
