//! Child scoring and root-move selection
//!
//! The UCT score drives both the in-tree child choice and the final
//! root-move pick. The root pick additionally orders children by their
//! decided status: take a forced win as fast as possible, avoid a forced
//! loss as long as possible, and prefer an undecided move over a forced
//! draw.

use crate::tree::{NodeId, NodePool, TerminalType};
use crate::MctsConfig;
use tactix_core::Move;

// ============================================================================
// UCT SCORER
// ============================================================================

/// UCT score of a child node.
///
/// ```text
/// UCT(c) = c.value / c.sims + W_b * C * sqrt(ln(parent.sims) / c.sims)
/// W_b    = 0.2 * branches * weight / c.depth
/// ```
///
/// The `0.2 * branches` factor leans toward exploration when the fan-out is
/// wide; the `1 / depth` factor damps exploration deep in the tree.
///
/// Panics when called on the root or on a child that has never been
/// simulated; callers filter those out.
pub fn uct(pool: &NodePool, id: NodeId, number_of_branches: u32, config: &MctsConfig) -> f64 {
    let node = pool.node(id);
    let parent = node.parent.expect("uct is undefined for the root");
    assert!(
        node.num_simulations > 0,
        "uct on a child that was never simulated"
    );

    let parent_sims = pool.node(parent).num_simulations as f64;
    let child_sims = node.num_simulations as f64;

    let exploitation = node.value / child_sims;
    let branch_weight = 0.2 * number_of_branches as f64 * config.exploration_weight;
    let weighted_exploration = branch_weight * config.exploration_factor / node.depth as f64;

    exploitation + weighted_exploration * (parent_sims.ln() / child_sims).sqrt()
}

// ============================================================================
// ROOT-MOVE SELECTION
// ============================================================================

/// Strategy for the final root-move pick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WinSelection {
    /// Terminal-category ordering with UCT tiebreaks.
    #[default]
    HighestUct,
    /// Most-visited child, still short-circuiting to a forced win.
    MostSimulated,
}

/// Pick the move to play from the root's children.
///
/// Panics if no child was ever expanded; the termination predicate must
/// allow at least one iteration.
pub fn pick_best_root_move(pool: &NodePool, root: NodeId, config: &MctsConfig) -> Move {
    match config.win_selection {
        WinSelection::HighestUct => best_by_uct(pool, root, config),
        WinSelection::MostSimulated => best_by_visits(pool, root, config),
    }
}

fn best_by_uct(pool: &NodePool, root: NodeId, config: &MctsConfig) -> Move {
    let children = pool.children(root).as_slice();
    assert!(
        !children.is_empty(),
        "no children expanded at the root; at least one iteration must run"
    );
    let number_of_branches = children.len() as u32;

    let mut best = children[0];
    let mut best_uct = uct(pool, best, number_of_branches, config);
    for &challenger in &children[1..] {
        let challenger_uct = uct(pool, challenger, number_of_branches, config);
        if replaces(pool, challenger, challenger_uct, best, best_uct) {
            best = challenger;
            best_uct = challenger_uct;
        }
    }

    pool.node(best).move_to_get_here
}

/// Category order for the root pick: a forced win beats everything, an
/// undecided move beats a forced draw, and anything beats a forced loss.
fn category_rank(terminal: TerminalType) -> u32 {
    match terminal {
        TerminalType::Winning => 3,
        TerminalType::NotTerminal => 2,
        TerminalType::Neutral => 1,
        TerminalType::Losing => 0,
    }
}

/// Does `challenger` displace the incumbent best child?
fn replaces(
    pool: &NodePool,
    challenger: NodeId,
    challenger_uct: f64,
    incumbent: NodeId,
    incumbent_uct: f64,
) -> bool {
    let c = pool.node(challenger);
    let i = pool.node(incumbent);

    let (c_rank, i_rank) = (category_rank(c.terminal_type), category_rank(i.terminal_type));
    if c_rank != i_rank {
        return c_rank > i_rank;
    }

    match c.terminal_type {
        // Win as soon as possible
        TerminalType::Winning => {
            c.terminal_depth.winning < i.terminal_depth.winning
                || (c.terminal_depth.winning == i.terminal_depth.winning
                    && challenger_uct > incumbent_uct)
        }
        TerminalType::NotTerminal => challenger_uct > incumbent_uct,
        // Stall: a draw that takes longer leaves more room for a mistake
        TerminalType::Neutral => {
            c.terminal_depth.neutral > i.terminal_depth.neutral
                || (c.terminal_depth.neutral == i.terminal_depth.neutral
                    && challenger_uct > incumbent_uct)
        }
        // Lose as late as possible
        TerminalType::Losing => {
            c.terminal_depth.losing > i.terminal_depth.losing
                || (c.terminal_depth.losing == i.terminal_depth.losing
                    && challenger_uct > incumbent_uct)
        }
    }
}

fn best_by_visits(pool: &NodePool, root: NodeId, config: &MctsConfig) -> Move {
    let children = pool.children(root).as_slice();
    assert!(
        !children.is_empty(),
        "no children expanded at the root; at least one iteration must run"
    );

    // A decided win still wins the pick, fastest line first.
    let forced_win = children
        .iter()
        .filter(|&&child| pool.node(child).terminal_type == TerminalType::Winning)
        .min_by_key(|&&child| pool.node(child).terminal_depth.winning);
    if let Some(&winner) = forced_win {
        return pool.node(winner).move_to_get_here;
    }

    let number_of_branches = children.len() as u32;
    let mut best = children[0];
    for &challenger in &children[1..] {
        let (c_sims, i_sims) = (
            pool.node(challenger).num_simulations,
            pool.node(best).num_simulations,
        );
        if c_sims > i_sims {
            best = challenger;
        } else if c_sims == i_sims
            && uct(pool, challenger, number_of_branches, config)
                > uct(pool, best, number_of_branches, config)
        {
            best = challenger;
        }
    }

    pool.node(best).move_to_get_here
}

// ============================================================================
// TESTS
// ============================================================================
