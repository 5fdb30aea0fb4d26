/// Query node lifecycle
///
/// This module defines every state a query node passes through while the
/// orchestrator processes it.
use crate::SweepError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a query node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    // ===== Active States =====
    /// Node is in the frontier waiting to be processed
    Queued,

    /// Node's pages are being fetched
    Paging,

    // ===== Paging Outcomes =====
    /// A short or empty page ended paging
    Exhausted,

    /// The page cap ended paging before the results ran out
    Capped,

    /// Query was too short to search and went straight to expansion
    Skipped,

    /// A fetch failed and the node was abandoned
    Failed,

    /// The crawl was cancelled while this node was paging
    Cancelled,

    // ===== Completion States =====
    /// Children were enqueued
    Expanded,

    /// Node is fully processed
    Done,
}

impl NodeState {
    /// Returns true if paging has ended one way or another
    pub fn is_paging_outcome(&self) -> bool {
        matches!(
            self,
            Self::Exhausted | Self::Capped | Self::Skipped | Self::Failed | Self::Cancelled
        )
    }

    /// Returns true if no further transition is allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Returns true if the node may still be expanded from this state
    pub fn can_expand(&self) -> bool {
        matches!(self, Self::Exhausted | Self::Capped | Self::Skipped)
    }

    /// Checks whether moving to `next` follows the lifecycle
    ///
    /// `Queued → Paging → {Exhausted | Capped} → (Expanded) → Done`, with
    /// `Queued → Skipped` for short prefixes and `Paging → {Failed | Cancelled}`.
    pub fn can_transition_to(&self, next: NodeState) -> bool {
        match (self, next) {
            (Self::Queued, Self::Paging | Self::Skipped) => true,
            (
                Self::Paging,
                Self::Exhausted | Self::Capped | Self::Failed | Self::Cancelled,
            ) => true,
            (from, Self::Expanded) if from.can_expand() => true,
            (Self::Exhausted | Self::Capped | Self::Skipped | Self::Expanded, Self::Done) => true,
            _ => false,
        }
    }

    /// Moves to `next`, or fails if the lifecycle does not allow it
    pub fn transition(self, next: NodeState) -> Result<NodeState, SweepError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SweepError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Stable lowercase name, as used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Paging => "paging",
            Self::Exhausted => "exhausted",
            Self::Capped => "capped",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Expanded => "expanded",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
