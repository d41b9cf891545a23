//! Random-playout simulator
//!
//! Replays a move prefix on a copy of the position, then finishes the game
//! with uniformly random moves. The number of playouts scales with how open
//! the position still is; a prefix that already decides the game skips the
//! rollouts and reports the decided outcome at full weight.

use crate::game::{GameOutcome, GameState, Player};
use crate::moves::MoveSequence;
use rand::Rng;

/// Playouts run per cell still open after the prefix.
pub const PLAYOUTS_PER_OPEN_CELL: u32 = 15;

/// Aggregated result of one batch of playouts.
#[derive(Clone, Copy, Debug)]
pub struct PlayoutStats {
    /// Summed value for the player on turn at `state`: +1 per win, -1 per
    /// loss, 0 per draw.
    pub value: f64,
    /// Number of playouts contributing to `value`.
    pub playouts: u32,
    /// The decided outcome when the prefix alone ends the game.
    pub decided: Option<GameOutcome>,
}

impl GameOutcome {
    /// Simulation value of a decided outcome.
    fn value(self) -> f64 {
        match self {
            GameOutcome::Win => 1.0,
            GameOutcome::Loss => -1.0,
            GameOutcome::Draw => 0.0,
            GameOutcome::Ongoing => unreachable!("ongoing games have no value"),
        }
    }
}

/// Run a batch of playouts for the position reached through `prefix`.
///
/// The prefix must consist of open cells and must not end the game before
/// its last move.
pub fn simulate_prefix<R: Rng>(
    state: &GameState,
    prefix: &MoveSequence,
    rng: &mut R,
) -> PlayoutStats {
    let root_player = state.current_player();

    let open_after_prefix = state
        .legal_moves()
        .moves_left()
        .checked_sub(prefix.len() as u32)
        .expect("prefix longer than the open cells");
    let playouts = (open_after_prefix * PLAYOUTS_PER_OPEN_CELL).max(1);

    let mut position = *state;
    for (applied, &mv) in prefix.as_slice().iter().enumerate() {
        assert!(
            !position.is_over(),
            "game decided with {} prefix moves still to apply",
            prefix.len() - applied
        );
        position = position.apply_move(mv);
    }

    if position.is_over() {
        let outcome = position.outcome_for(root_player);
        return PlayoutStats {
            value: outcome.value() * playouts as f64,
            playouts,
            decided: Some(outcome),
        };
    }

    let mut value = 0.0;
    for _ in 0..playouts {
        value += random_completion(position, root_player, rng);
    }

    PlayoutStats {
        value,
        playouts,
        decided: None,
    }
}

/// Finish one game with uniformly random moves, scoring it for `root_player`.
fn random_completion<R: Rng>(mut position: GameState, root_player: Player, rng: &mut R) -> f64 {
    while !position.is_over() {
        let open = position.legal_moves();
        let offset = rng.gen_range(0..open.moves_left() as usize);
        let mv = open.nth(offset).expect("offset within the open cells");
        position = position.apply_move(mv);
    }
    position.outcome_for(root_player).value()
}

// ============================================================================
// TESTS
// ============================================================================
