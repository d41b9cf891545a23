//! Tic-tac-toe game state and outcome detection

use crate::moves::{Move, MoveSet, MAX_MOVES};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Player symbol
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Player {
    Cross,
    Circle,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::Cross => Player::Circle,
            Player::Circle => Player::Cross,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Player::Cross => 'X',
            Player::Circle => 'O',
        }
    }
}

/// Game outcome from the point of view of a specific player
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    Win,
    Loss,
    Draw,
    Ongoing,
}

/// The eight winning lines of the 3x3 board, as cell indices.
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Game state (copy to mutate)
#[derive(Clone, Copy, Debug)]
pub struct GameState {
    cells: [Option<Player>; MAX_MOVES],
    player_to_move: Player,
    legal: MoveSet,
}

impl GameState {
    /// Empty board with `first_to_move` on turn.
    pub fn new(first_to_move: Player) -> Self {
        Self {
            cells: [None; MAX_MOVES],
            player_to_move: first_to_move,
            legal: MoveSet::full(),
        }
    }

    pub fn current_player(&self) -> Player {
        self.player_to_move
    }

    /// Moves still open at this position.
    pub fn legal_moves(&self) -> &MoveSet {
        &self.legal
    }

    pub fn cell(&self, mv: Move) -> Option<Player> {
        self.cells[mv.index()]
    }

    /// Apply a move for the player on turn, returning the new state.
    ///
    /// Panics if the cell is already taken.
    pub fn apply_move(&self, mv: Move) -> Self {
        assert!(
            self.cells[mv.index()].is_none(),
            "cell {} already taken",
            mv
        );
        let mut next = *self;
        next.cells[mv.index()] = Some(self.player_to_move);
        next.legal.delete(mv);
        next.player_to_move = self.player_to_move.opponent();
        next
    }

    /// The player holding a completed line, if any.
    pub fn winner(&self) -> Option<Player> {
        for line in &LINES {
            if let Some(player) = self.cells[line[0]] {
                if self.cells[line[1]] == Some(player) && self.cells[line[2]] == Some(player) {
                    return Some(player);
                }
            }
        }
        None
    }

    pub fn is_full(&self) -> bool {
        self.legal.is_empty()
    }

    /// Outcome of the position as seen by `player`.
    pub fn outcome_for(&self, player: Player) -> GameOutcome {
        match self.winner() {
            Some(winner) if winner == player => GameOutcome::Win,
            Some(_) => GameOutcome::Loss,
            None if self.is_full() => GameOutcome::Draw,
            None => GameOutcome::Ongoing,
        }
    }

    /// True once the position has a winner or no open cell.
    pub fn is_over(&self) -> bool {
        self.winner().is_some() || self.is_full()
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..3 {
            for column in 0..3 {
                match self.cells[row * 3 + column] {
                    Some(player) => write!(f, "{} ", player.symbol())?,
                    None => write!(f, ". ")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn play(state: GameState, cells: &[usize]) -> GameState {
        cells
            .iter()
            .fold(state, |state, &cell| state.apply_move(Move::new(cell)))
    }

    #[test]
    fn test_new_game() {
        let state = GameState::new(Player::Circle);
        assert_eq!(state.current_player(), Player::Circle);
        assert_eq!(state.legal_moves().moves_left(), MAX_MOVES as u32);
        assert_eq!(state.winner(), None);
        assert!(!state.is_over());
    }

    #[test]
    fn test_apply_move_alternates() {
        let state = GameState::new(Player::Cross);
        let state = state.apply_move(Move::new(4));
        assert_eq!(state.current_player(), Player::Circle);
        assert_eq!(state.cell(Move::new(4)), Some(Player::Cross));
        assert!(!state.legal_moves().contains(Move::new(4)));
    }

    #[test]
    #[should_panic]
    fn test_apply_move_taken_cell() {
        let state = GameState::new(Player::Cross).apply_move(Move::new(0));
        state.apply_move(Move::new(0));
    }

    #[test]
    fn test_row_win() {
        // X X X across the top; O elsewhere
        let state = play(GameState::new(Player::Cross), &[0, 3, 1, 4, 2]);
        assert_eq!(state.winner(), Some(Player::Cross));
        assert_eq!(state.outcome_for(Player::Cross), GameOutcome::Win);
        assert_eq!(state.outcome_for(Player::Circle), GameOutcome::Loss);
    }

    #[test]
    fn test_column_win() {
        let state = play(GameState::new(Player::Circle), &[2, 0, 5, 1, 8]);
        assert_eq!(state.winner(), Some(Player::Circle));
    }

    #[test]
    fn test_diagonal_win() {
        let state = play(GameState::new(Player::Cross), &[0, 1, 4, 2, 8]);
        assert_eq!(state.winner(), Some(Player::Cross));
    }

    #[test]
    fn test_draw() {
        // X X O / O O X / X O X leaves no line for either player
        let state = play(GameState::new(Player::Cross), &[0, 2, 1, 3, 5, 4, 6, 7, 8]);
        assert_eq!(state.winner(), None);
        assert!(state.is_full());
        assert_eq!(state.outcome_for(Player::Cross), GameOutcome::Draw);
        assert_eq!(state.outcome_for(Player::Circle), GameOutcome::Draw);
    }

    #[test]
    fn test_display_board() {
        let state = play(GameState::new(Player::Cross), &[0, 4]);
        let rendered = format!("{}", state);
        assert_eq!(rendered, "X . . \n. O . \n. . . \n");
    }
}
