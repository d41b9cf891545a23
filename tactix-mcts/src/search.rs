//! The search loop: selection, expansion, backpropagation
//!
//! One iteration walks the tree from the root, hands back either a decided
//! node or a leaf to simulate, then pushes the result up the parent chain.
//! Decided subtrees steer the walk: a controlled node grabs a winning child
//! outright, and a node whose children are all decided is itself marked
//! decided, which is how "every move here loses" climbs toward the root.

use rand::Rng;
use tactix_core::{Move, MoveSequence, MoveSet};

use crate::policy;
use crate::tree::{ControlledType, Node, NodeId, NodePool, TerminalType};
use crate::{MctsConfig, SearchError};

// ============================================================================
// SELECTION RESULT
// ============================================================================

/// Outcome of one selection pass.
#[derive(Clone, Copy, Debug)]
pub struct Selection {
    /// The node to simulate, or an already-decided node (possibly the root).
    pub node: NodeId,
    /// Moves from the root of this evaluation down to `node`. Decided nodes
    /// are returned without their own move; they are never simulated.
    pub move_prefix: MoveSequence,
}

// ============================================================================
// SEARCH ENGINE
// ============================================================================

/// Monte Carlo tree search over an externally supplied game.
///
/// Single-threaded: one evaluator owns one tree for the duration of a call.
pub struct Mcst {
    config: MctsConfig,
    root: Option<NodeId>,
}

impl Mcst {
    pub fn new(config: MctsConfig) -> Self {
        Self { config, root: None }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Root of the most recent evaluation, while the pool is unchanged.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Simulations accumulated at the root of the most recent evaluation.
    pub fn simulations_ran(&self, pool: &NodePool) -> u32 {
        match self.root {
            Some(root) => pool.node(root).num_simulations,
            None => 0,
        }
    }

    /// Search for the best move among `legal_at_root`.
    ///
    /// `terminate` is polled with `false` once per iteration; returning true
    /// ends the search. It is called once with `true` when the root itself
    /// becomes decided and no further simulation can matter. `simulate`
    /// receives the move prefix of a selected leaf and writes value,
    /// simulation count and optionally a decided status into it; the shared
    /// `rng` also drives the engine's random expansion picks.
    ///
    /// An empty legal set yields the invalid move without touching the pool.
    pub fn evaluate<R, T, S>(
        &mut self,
        legal_at_root: &MoveSet,
        mut terminate: T,
        mut simulate: S,
        pool: &mut NodePool,
        rng: &mut R,
    ) -> Result<Move, SearchError>
    where
        R: Rng,
        T: FnMut(bool) -> bool,
        S: FnMut(&MoveSequence, &mut Node, &mut R),
    {
        if legal_at_root.is_empty() {
            return Ok(Move::INVALID);
        }

        pool.clear();
        let root = pool.allocate(None)?;
        pool.node_mut(root).controlled_type = ControlledType::Controlled;
        self.root = Some(root);

        let mut iterations = 0u32;
        while !terminate(false) {
            let selection = self.selection(legal_at_root, pool, rng)?;
            let selected = selection.node;

            if pool.node(selected).terminal_type != TerminalType::NotTerminal {
                if selected == root {
                    // A decided root answers the search outright.
                    terminate(true);
                    break;
                }
            } else {
                simulate(&selection.move_prefix, pool.node_mut(selected), rng);
            }

            self.backpropagate(selected, pool);
            iterations += 1;
        }
        tracing::debug!(
            iterations,
            simulations = self.simulations_ran(pool),
            nodes = pool.allocated(),
            "search finished"
        );

        Ok(policy::pick_best_root_move(pool, root, &self.config))
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Walk from the root until a node needs simulating or is decided.
    fn selection<R: Rng>(
        &self,
        legal_at_root: &MoveSet,
        pool: &mut NodePool,
        rng: &mut R,
    ) -> Result<Selection, SearchError> {
        let root = self.root.expect("selection before evaluate");
        let mut result = Selection {
            node: root,
            move_prefix: MoveSequence::new(),
        };

        if pool.node(root).terminal_type != TerminalType::NotTerminal {
            return Ok(result);
        }

        let mut current = root;
        let mut remaining = *legal_at_root;
        loop {
            if remaining.is_empty() {
                // Path exhausted the move alphabet; the last node picked up
                // along the way is the one to simulate.
                break;
            }

            let chosen = self.select_child(current, &remaining, pool, rng)?;
            if pool.node(chosen).terminal_type != TerminalType::NotTerminal {
                // Decided child (or `current` itself, freshly promoted).
                result.node = chosen;
                return Ok(result);
            }

            result.node = chosen;
            result.move_prefix.push(pool.node(chosen).move_to_get_here);

            if pool.node(chosen).num_simulations == 0 {
                // Unexplored leaf: hand it to the simulator.
                return Ok(result);
            }

            remaining.delete(pool.node(chosen).move_to_get_here);
            current = chosen;
        }

        Ok(result)
    }

    /// Choose one child of `from`, expanding an untried move when warranted.
    ///
    /// A controlled node takes a winning child on the spot. Otherwise
    /// decided children are only remembered as fallbacks; if nothing
    /// undecided is selectable and no move is left to try, `from` itself is
    /// promoted to the fallback's status and returned.
    fn select_child<R: Rng>(
        &self,
        from: NodeId,
        legal_from_node: &MoveSet,
        pool: &mut NodePool,
        rng: &mut R,
    ) -> Result<NodeId, SearchError> {
        let controlled = pool.node(from).controlled_type;
        assert!(
            controlled != ControlledType::None,
            "selecting from a node with no side to move"
        );

        let number_of_branches = legal_from_node.moves_left();
        let mut remaining = *legal_from_node;

        // Candidates by decided status; (node, uct) pairs.
        let mut best: Option<(NodeId, f64)> = None;
        let mut neutral: Option<(NodeId, f64)> = None;
        let mut losing: Option<(NodeId, f64)> = None;
        let mut winning: Option<(NodeId, f64)> = None;

        let table = *pool.children(from);
        for &child in table.as_slice() {
            let node = pool.node(child);
            debug_assert!(node.move_to_get_here.is_valid());
            remaining.delete(node.move_to_get_here);

            assert!(
                node.num_simulations > 0,
                "attached child was never simulated"
            );
            let score = policy::uct(pool, child, number_of_branches, &self.config);

            match (pool.node(child).terminal_type, controlled) {
                (TerminalType::NotTerminal, ControlledType::Controlled) => {
                    if best.map_or(true, |(_, s)| score > s) {
                        best = Some((child, score));
                    }
                }
                (TerminalType::NotTerminal, _) => {
                    if best.map_or(true, |(_, s)| score < s) {
                        best = Some((child, score));
                    }
                }
                (TerminalType::Winning, ControlledType::Controlled) => {
                    // Forced win available: take it.
                    return Ok(child);
                }
                (TerminalType::Winning, _) => {
                    // The opponent dodges our win; remember the line it
                    // finds least attractive in case every move wins.
                    if winning.map_or(true, |(_, s)| score < s) {
                        winning = Some((child, score));
                    }
                }
                (TerminalType::Neutral, ControlledType::Controlled) => {
                    if neutral.map_or(true, |(_, s)| score > s) {
                        neutral = Some((child, score));
                    }
                }
                (TerminalType::Neutral, _) => {
                    if neutral.map_or(true, |(_, s)| score < s) {
                        neutral = Some((child, score));
                    }
                }
                (TerminalType::Losing, ControlledType::Controlled) => {
                    if losing.map_or(true, |(_, s)| score > s) {
                        losing = Some((child, score));
                    }
                }
                (TerminalType::Losing, _) => {
                    panic!("losing child under an uncontrolled node was not propagated");
                }
            }
        }

        // With no known draw to fall back on, try an untried move first.
        let has_room = !pool.children(from).is_full();
        if neutral.is_none() && has_room && remaining.moves_left() > 0 {
            let offset = rng.gen_range(0..remaining.moves_left() as usize);
            let mv = remaining.nth(offset).expect("offset within remaining moves");
            let child = self.expansion(from, pool)?;
            pool.add_child(from, child, mv)?;
            return Ok(child);
        }

        if let Some((child, _)) = best {
            return Ok(child);
        }

        // Every child is decided. The side to move settles for its best
        // decided outcome and `from` inherits that status.
        let fallback = match controlled {
            ControlledType::Controlled => neutral.or(losing),
            ControlledType::Uncontrolled => neutral.or(winning),
            ControlledType::None => unreachable!(),
        };
        let (fallback, _) = fallback.expect("a scanned child must be selectable or decided");
        let inherited = pool.node(fallback).terminal_type;
        pool.node_mut(from).terminal_type = inherited;
        Ok(from)
    }

    /// Allocate a fresh child of `from` on the opposite side to move.
    ///
    /// The caller attaches it with the chosen move; its zero simulation
    /// count is the signal to simulate it.
    fn expansion(&self, from: NodeId, pool: &mut NodePool) -> Result<NodeId, SearchError> {
        let inverted = pool.node(from).controlled_type.inverted();
        let child = pool.allocate(Some(from))?;
        pool.node_mut(child).controlled_type = inverted;
        Ok(child)
    }

    // ========================================================================
    // Backpropagation
    // ========================================================================

    /// Push `leaf`'s simulation result and decided status up to the root.
    ///
    /// A decided leaf stamps the depth its outcome materialises at; when the
    /// mover at the leaf forces that outcome (an opponent win, or our own
    /// loss), the parent is decided too. Deeper forcing is left to later
    /// selection passes, which promote a node once all its children are
    /// decided.
    fn backpropagate(&self, leaf: NodeId, pool: &mut NodePool) {
        let root = self.root.expect("backpropagate before evaluate");
        assert!(leaf != root, "the root itself is never a simulation target");
        debug_assert!(pool.node(root).terminal_type == TerminalType::NotTerminal);

        let leaf_terminal = pool.node(leaf).terminal_type;
        if leaf_terminal != TerminalType::NotTerminal {
            let parent = pool
                .node(leaf)
                .parent
                .expect("non-root leaf has a parent");

            {
                let node = pool.node_mut(leaf);
                match leaf_terminal {
                    TerminalType::Winning => node.terminal_depth.winning = node.depth,
                    TerminalType::Losing => node.terminal_depth.losing = node.depth,
                    TerminalType::Neutral => node.terminal_depth.neutral = node.depth,
                    TerminalType::NotTerminal => unreachable!(),
                }
            }

            let leaf_controlled = pool.node(leaf).controlled_type;
            let forced = matches!(
                (leaf_controlled, leaf_terminal),
                (ControlledType::Uncontrolled, TerminalType::Winning)
                    | (ControlledType::Controlled, TerminalType::Losing)
            );
            if forced {
                pool.node_mut(parent).terminal_type = leaf_terminal;
            }

            let depths = pool.node(leaf).terminal_depth;
            pool.node_mut(parent).terminal_depth.merge_from_child(depths);
        }

        let (leaf_value, leaf_sims) = {
            let node = pool.node(leaf);
            (node.value, node.num_simulations)
        };

        let mut current = pool.node(leaf).parent;
        while let Some(id) = current {
            let parent = pool.node(id).parent;
            if let Some(parent) = parent {
                let depths = pool.node(id).terminal_depth;
                pool.node_mut(parent).terminal_depth.merge_from_child(depths);
            }

            let node = pool.node_mut(id);
            node.num_simulations += leaf_sims;
            node.value += leaf_value;

            current = parent;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
