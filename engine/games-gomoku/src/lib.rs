//! Gomoku environment for the Prooftree engine
//!
//! A 5x5 free-style Gomoku: players alternately place a stone on any empty
//! cell and the first to form an unbroken line of four, horizontally,
//! vertically or diagonally, wins. A full board without a line is a draw.
//!
//! # Board Layout
//!
//! Cells are stored row-major with row 0 at the top:
//! ```text
//! Row 0: [ 0][ 1][ 2][ 3][ 4]
//! Row 1: [ 5][ 6][ 7][ 8][ 9]
//! Row 2: [10][11][12][13][14]
//! Row 3: [15][16][17][18][19]
//! Row 4: [20][21][22][23][24]
//! ```

use std::fmt;

use engine_core::{
    has_line_through, plane_features, render_board, resign_score, Action, Environment, Player,
    Rotation,
};

/// Board dimensions
pub const BOARD_SIZE: usize = 5;
pub const NUM_CELLS: usize = BOARD_SIZE * BOARD_SIZE; // 25
/// Stones in a row needed to win.
pub const WIN_LENGTH: usize = 4;
/// The central cell.
pub const CENTER: usize = NUM_CELLS / 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gomoku {
    /// 0 = empty, 1 = black (P1), 2 = white (P2)
    board: [u8; NUM_CELLS],
    turn: Player,
    /// Winner: 0=none/ongoing, 1=P1, 2=P2, 3=draw
    winner: u8,
    history: Vec<Action>,
}

impl Gomoku {
    pub fn new() -> Self {
        Self {
            board: [0; NUM_CELLS],
            turn: Player::P1,
            winner: 0,
            history: Vec::with_capacity(NUM_CELLS),
        }
    }

    /// Play cell indices alternating from P1; `None` if any move is illegal.
    pub fn from_moves(moves: &[usize]) -> Option<Self> {
        let mut env = Self::new();
        for &pos in moves {
            if !env.act(Action::new(pos, env.turn)) {
                return None;
            }
        }
        Some(env)
    }

    pub fn board(&self) -> &[u8; NUM_CELLS] {
        &self.board
    }

    pub fn winner(&self) -> u8 {
        self.winner
    }

    /// Chebyshev distance of a cell from the centre.
    pub fn distance_from_center(pos: usize) -> usize {
        let (row, col) = (pos / BOARD_SIZE, pos % BOARD_SIZE);
        let center = BOARD_SIZE / 2;
        row.abs_diff(center).max(col.abs_diff(center))
    }
}

impl Default for Gomoku {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for Gomoku {
    fn name(&self) -> &'static str {
        "gomoku"
    }

    fn board_size(&self) -> usize {
        BOARD_SIZE
    }

    fn policy_size(&self) -> usize {
        NUM_CELLS
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn act(&mut self, action: Action) -> bool {
        if !self.is_legal_action(action) {
            return false;
        }

        let pos = action.id();
        self.board[pos] = action.player().cell();
        if has_line_through(&self.board, BOARD_SIZE, pos, WIN_LENGTH) {
            self.winner = action.player().cell();
        } else if self.board.iter().all(|&cell| cell != 0) {
            self.winner = 3;
        }
        self.turn = action.next_player();
        self.history.push(action);
        true
    }

    fn is_legal_action(&self, action: Action) -> bool {
        self.winner == 0
            && action.player() == self.turn
            && action.id() < NUM_CELLS
            && self.board[action.id()] == 0
    }

    fn action_history(&self) -> &[Action] {
        &self.history
    }

    fn is_terminal(&self) -> bool {
        self.winner != 0
    }

    fn turn(&self) -> Player {
        self.turn
    }

    fn eval_score(&self, is_resign: bool) -> f32 {
        if is_resign {
            return resign_score(self.turn);
        }
        match self.winner {
            1 => 1.0,
            2 => -1.0,
            _ => 0.0,
        }
    }

    fn features(&self, rotation: Rotation) -> Vec<f32> {
        plane_features(&self.board, BOARD_SIZE, self.turn, rotation)
    }
}

impl fmt::Display for Gomoku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_board(&self.board, BOARD_SIZE, ['.', 'X', 'O']))
    }
}
