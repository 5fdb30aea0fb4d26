//! Crawl frontier
//!
//! An arena of query nodes plus an index cursor. Nodes are never removed;
//! the cursor walks the arena in insertion order, which makes processing
//! strictly breadth-first: every sibling at one depth is handled before any
//! of their children, since children are appended behind them.

use serde::Serialize;
use std::collections::HashSet;

/// Index of a node in the frontier arena
pub type NodeId = usize;

/// One keyword/prefix to search at a given expansion depth
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueryNode {
    pub query: String,
    pub depth: u32,
}

impl QueryNode {
    pub fn new(query: impl Into<String>, depth: u32) -> Self {
        Self {
            query: query.into(),
            depth,
        }
    }

    /// Builds the child for one alphabet symbol
    pub fn child(&self, symbol: char) -> Self {
        let mut query = String::with_capacity(self.query.len() + symbol.len_utf8());
        query.push_str(&self.query);
        query.push(symbol);
        Self {
            query,
            depth: self.depth + 1,
        }
    }
}

/// FIFO work queue of query nodes
#[derive(Debug)]
pub struct Frontier {
    /// Every node ever admitted, in admission order
    arena: Vec<QueryNode>,

    /// Next arena index to hand out
    cursor: usize,

    /// Optional cap on `arena.len()`
    max_nodes: Option<usize>,

    /// Nodes refused because of the cap
    dropped: usize,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new(max_nodes: Option<usize>) -> Self {
        Self {
            arena: Vec::new(),
            cursor: 0,
            max_nodes,
            dropped: 0,
        }
    }

    /// Creates a frontier holding the seeds at depth 0
    ///
    /// Repeated seeds are admitted once.
    pub fn seeded(seeds: &[String], max_nodes: Option<usize>) -> Self {
        let mut frontier = Self::new(max_nodes);
        let mut seen = HashSet::new();
        for seed in seeds {
            let seed = seed.trim();
            if !seen.insert(seed.to_string()) {
                tracing::warn!("Ignoring repeated seed query '{}'", seed);
                continue;
            }
            frontier.push(QueryNode::new(seed, 0));
        }
        frontier
    }

    /// Admits a node, unless the node cap has been reached
    pub fn push(&mut self, node: QueryNode) -> Option<NodeId> {
        if let Some(max) = self.max_nodes {
            if self.arena.len() >= max {
                self.dropped += 1;
                return None;
            }
        }
        self.arena.push(node);
        Some(self.arena.len() - 1)
    }

    /// Admits one child of `parent` per alphabet symbol, returning how many were admitted
    pub fn push_children(&mut self, parent: &QueryNode, alphabet: &[char]) -> usize {
        let mut admitted = 0;
        for &symbol in alphabet {
            if self.push(parent.child(symbol)).is_some() {
                admitted += 1;
            }
        }
        if admitted < alphabet.len() {
            tracing::warn!(
                "Node cap reached: admitted {} of {} children of '{}'",
                admitted,
                alphabet.len(),
                parent.query
            );
        }
        admitted
    }

    /// Hands out the next node in FIFO order
    pub fn pop(&mut self) -> Option<NodeId> {
        if self.cursor < self.arena.len() {
            self.cursor += 1;
            Some(self.cursor - 1)
        } else {
            None
        }
    }

    /// Gets a node by ID
    pub fn get(&self, id: NodeId) -> &QueryNode {
        &self.arena[id]
    }

    /// Number of nodes still waiting
    pub fn pending(&self) -> usize {
        self.arena.len() - self.cursor
    }

    /// Returns whether no node is waiting
    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    /// Total nodes ever admitted
    pub fn created(&self) -> usize {
        self.arena.len()
    }

    /// Nodes refused because of the cap
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Returns whether the node cap refused at least one node
    pub fn cap_reached(&self) -> bool {
        self.dropped > 0
    }
}
