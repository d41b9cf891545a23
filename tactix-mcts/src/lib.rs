//! TACTIX MCTS - Monte Carlo Tree Search engine
//!
//! This crate provides the search engine proper:
//! - Node arena with stable indices, reused across evaluations
//! - UCT child scoring with branching- and depth-aware exploration
//! - Terminal-aware tree policy (selection, expansion)
//! - Backpropagation with forced-outcome propagation and depth tracking
//! - Pluggable root-move selection strategies
//!
//! The engine knows nothing about any concrete game. Callers hand it the
//! legal moves at the root, a simulation callback, and a termination
//! predicate; moves are opaque tokens from a bounded alphabet.

mod policy;
mod search;
mod tree;

pub use policy::{uct, WinSelection};
pub use search::{Mcst, Selection};
pub use tree::{ChildTable, ControlledType, Node, NodeId, NodePool, TerminalDepth, TerminalType};

use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// Fatal search failures. Both indicate a sizing mismatch between the pool
/// and the position; there is no local recovery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The node arena ran out of slots during expansion.
    #[error("node pool exhausted ({capacity} slots)")]
    OutOfNodes { capacity: usize },
    /// A node already holds one child per alphabet slot.
    #[error("child table full ({max} children)")]
    ChildTableFull { max: usize },
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// MCTS configuration
#[derive(Clone, Debug)]
pub struct MctsConfig {
    /// Upper bound on nodes per evaluation; exceeding it aborts the search.
    pub arena_capacity: usize,
    /// UCT exploration constant (C)
    pub exploration_factor: f64,
    /// Extra multiplier on the exploration term, reserved for external
    /// tuning.
    pub exploration_weight: f64,
    /// How the final root move is picked.
    pub win_selection: WinSelection,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            arena_capacity: 8192,
            exploration_factor: std::f64::consts::SQRT_2,
            exploration_weight: 1.0,
            win_selection: WinSelection::HighestUct,
        }
    }
}

impl MctsConfig {
    /// Create config with a specific arena capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena_capacity: capacity,
            ..Default::default()
        }
    }

    /// Create config with a specific exploration constant
    pub fn with_exploration(mut self, c: f64) -> Self {
        self.exploration_factor = c;
        self
    }

    /// Create config with a specific exploration weight
    pub fn with_exploration_weight(mut self, weight: f64) -> Self {
        self.exploration_weight = weight;
        self
    }

    /// Create config with a specific win-selection strategy
    pub fn with_win_selection(mut self, strategy: WinSelection) -> Self {
        self.win_selection = strategy;
        self
    }
}

// ============================================================================
// TESTS
// ============================================================================
