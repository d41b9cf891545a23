//! Integration tests for the tic-tac-toe search harness
//!
//! Drives the full stack: game state, playout simulator and the search
//! engine, with an iteration-capped termination predicate so the runs stay
//! deterministic under a fixed seed.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use tactix_core::{simulate_prefix, GameOutcome, GameState, Move, Player};
use tactix_mcts::{Mcst, MctsConfig, NodePool, TerminalType};

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn play(state: GameState, cells: &[usize]) -> GameState {
    cells
        .iter()
        .fold(state, |state, &cell| state.apply_move(Move::new(cell)))
}

/// Search `state` for at most `iterations` iterations under a fixed seed.
fn best_move(state: &GameState, iterations: u32, seed: u64) -> Move {
    let config = MctsConfig::default();
    let mut mcst = Mcst::new(config.clone());
    let mut pool = NodePool::new(config.arena_capacity);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let position = *state;
    let mut done = 0u32;
    mcst.evaluate(
        state.legal_moves(),
        move |found_perfect_move| {
            if found_perfect_move {
                return true;
            }
            done += 1;
            done > iterations
        },
        |prefix, node, rng| {
            let stats = simulate_prefix(&position, prefix, rng);
            node.value += stats.value;
            node.num_simulations += stats.playouts;
            if let Some(outcome) = stats.decided {
                node.terminal_type = match outcome {
                    GameOutcome::Win => TerminalType::Winning,
                    GameOutcome::Loss => TerminalType::Losing,
                    GameOutcome::Draw => TerminalType::Neutral,
                    GameOutcome::Ongoing => unreachable!(),
                };
            }
        },
        &mut pool,
        &mut rng,
    )
    .expect("search completes within the pool capacity")
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
fn test_takes_an_immediate_win() {
    // X holds 0 and 1 with the top row open at 2.
    let state = play(GameState::new(Player::Cross), &[0, 3, 1, 4]);
    assert_eq!(state.current_player(), Player::Cross);

    let selected = best_move(&state, 200, 11);
    assert_eq!(selected, Move::new(2));
}

#[test]
fn test_blocks_an_immediate_threat() {
    // O holds 3 and 4; X must cover 5 or lose on the next move.
    let state = play(GameState::new(Player::Cross), &[0, 3, 8, 4]);
    assert_eq!(state.current_player(), Player::Cross);

    let selected = best_move(&state, 500, 13);
    assert_eq!(selected, Move::new(5));
}

#[test]
fn test_win_preferred_over_block() {
    // Both sides threaten a row; completing our own beats blocking theirs.
    let state = play(GameState::new(Player::Cross), &[0, 3, 1, 4, 8, 6]);
    assert_eq!(state.current_player(), Player::Cross);

    let selected = best_move(&state, 200, 17);
    assert_eq!(selected, Move::new(2));
}

#[test]
fn test_last_open_cell_is_played() {
    // Eight cells filled without a winner; only 8 remains.
    let state = play(GameState::new(Player::Cross), &[0, 2, 1, 3, 5, 4, 6, 7]);
    assert!(!state.is_over());

    let selected = best_move(&state, 50, 19);
    assert_eq!(selected, Move::new(8));
}

#[test]
fn test_selfplay_game_finishes_legally() {
    let mut state = GameState::new(Player::Circle);
    let mut moves = 0;

    while !state.is_over() {
        let selected = best_move(&state, 800, 23 + moves as u64);
        assert!(selected.is_valid());
        assert!(state.legal_moves().contains(selected));
        state = state.apply_move(selected);
        moves += 1;
        assert!(moves <= 9);
    }

    let outcome = state.outcome_for(Player::Circle);
    assert_ne!(outcome, GameOutcome::Ongoing);
}

#[test]
fn test_search_is_deterministic_for_a_position() {
    let state = play(GameState::new(Player::Cross), &[4, 0]);

    let first = best_move(&state, 300, 29);
    let second = best_move(&state, 300, 29);
    assert_eq!(first, second);
}
