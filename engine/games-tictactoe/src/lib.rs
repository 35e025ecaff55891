//! TicTacToe environment for the Prooftree engine
//!
//! The smallest complete [`Environment`]: a 3x3 board, nine actions (one per
//! cell, row-major), P1 plays `X` and moves first.
//!
//! # Usage
//!
//! ```rust
//! use engine_core::{Action, Environment, Player};
//! use games_tictactoe::TicTacToe;
//!
//! let mut env = TicTacToe::new();
//! assert!(env.act(Action::new(4, Player::P1)));
//! assert_eq!(env.turn(), Player::P2);
//! ```

use std::fmt;

use engine_core::{plane_features, render_board, resign_score, Action, Environment, Player, Rotation};

/// Side length of the board.
pub const BOARD_SIZE: usize = 3;
/// Number of cells, which is also the number of actions.
pub const NUM_CELLS: usize = BOARD_SIZE * BOARD_SIZE;

/// Winning positions (rows, columns, diagonals)
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8], // rows
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8], // columns
    [0, 4, 8],
    [2, 4, 6], // diagonals
];

/// TicTacToe position plus move history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicTacToe {
    /// Board representation: 0=empty, 1=X, 2=O
    board: [u8; NUM_CELLS],
    /// Player to move
    turn: Player,
    /// Winner: 0=none/ongoing, 1=X, 2=O, 3=draw
    winner: u8,
    history: Vec<Action>,
}

impl TicTacToe {
    /// Create a new initial game state
    pub fn new() -> Self {
        Self {
            board: [0; NUM_CELLS],
            turn: Player::P1, // X goes first
            winner: 0,
            history: Vec::with_capacity(NUM_CELLS),
        }
    }

    /// Play a sequence of cell indices alternating from P1.
    ///
    /// Returns `None` if any move is illegal.
    pub fn from_moves(moves: &[usize]) -> Option<Self> {
        let mut env = Self::new();
        for &pos in moves {
            let action = Action::new(pos, env.turn);
            if !env.act(action) {
                return None;
            }
        }
        Some(env)
    }

    pub fn board(&self) -> &[u8; NUM_CELLS] {
        &self.board
    }

    /// Winner: 0=none/ongoing, 1=P1, 2=P2, 3=draw
    pub fn winner(&self) -> u8 {
        self.winner
    }

    /// Check for winner on the board
    fn check_winner(board: &[u8; NUM_CELLS]) -> u8 {
        for line in &LINES {
            let [a, b, c] = *line;
            if board[a] != 0 && board[a] == board[b] && board[b] == board[c] {
                return board[a]; // Return the winning player
            }
        }

        // Check for draw (board full but no winner)
        if board.iter().all(|&cell| cell != 0) {
            return 3; // Draw
        }

        0 // Game ongoing
    }
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for TicTacToe {
    fn name(&self) -> &'static str {
        "tictactoe"
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

        self.board[action.id()] = action.player().cell();
        self.winner = Self::check_winner(&self.board);
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

impl fmt::Display for TicTacToe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_board(&self.board, BOARD_SIZE, ['.', 'X', 'O']))
    }
}
