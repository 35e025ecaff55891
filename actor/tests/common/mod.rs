//! Mock networks shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use engine_core::{has_line_through, Player};
use games_gomoku::Gomoku;
use games_tictactoe::{BOARD_SIZE, NUM_CELLS};
use mcts::{EvaluatorError, Network, NetworkOutput};

/// Uniform policy, constant value, and a log of every batch size seen.
pub struct RecordingNetwork {
    action_size: usize,
    batch_sizes: Mutex<Vec<usize>>,
}

impl RecordingNetwork {
    pub fn new(action_size: usize) -> Self {
        Self {
            action_size,
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }
}

impl Network for RecordingNetwork {
    fn name(&self) -> &str {
        "recording"
    }

    fn action_size(&self) -> usize {
        self.action_size
    }

    fn evaluate_batch(&self, features: &[Vec<f32>]) -> Result<Vec<NetworkOutput>, EvaluatorError> {
        self.batch_sizes.lock().unwrap().push(features.len());
        Ok(features
            .iter()
            .map(|_| NetworkOutput::from_logits(vec![0.0; self.action_size], 0.0))
            .collect())
    }
}

/// Logits fall off with the distance from the centre of a Gomoku board.
pub struct CenterPeakedNetwork;

impl Network for CenterPeakedNetwork {
    fn name(&self) -> &str {
        "center-peaked"
    }

    fn action_size(&self) -> usize {
        games_gomoku::NUM_CELLS
    }

    fn evaluate_batch(&self, features: &[Vec<f32>]) -> Result<Vec<NetworkOutput>, EvaluatorError> {
        let logits: Vec<f32> = (0..games_gomoku::NUM_CELLS)
            .map(|pos| -3.0 * Gomoku::distance_from_center(pos) as f32)
            .collect();
        Ok(features
            .iter()
            .map(|_| NetworkOutput::from_logits(logits.clone(), 0.0))
            .collect())
    }
}

/// Tic-Tac-Toe value oracle: +1 when P1 has won or can win on this move, -1
/// for the same about P2, 0 otherwise. The policy is uniform.
pub struct WinOracleNetwork;

impl WinOracleNetwork {
    pub fn value(features: &[f32]) -> f32 {
        let mut board = [0u8; NUM_CELLS];
        for (pos, cell) in board.iter_mut().enumerate() {
            if features[pos] == 1.0 {
                *cell = Player::P1.cell();
            } else if features[NUM_CELLS + pos] == 1.0 {
                *cell = Player::P2.cell();
            }
        }
        let turn = if features[2 * NUM_CELLS] == 1.0 {
            Player::P1
        } else {
            Player::P2
        };

        for player in [Player::P1, Player::P2] {
            if has_line(&board, player) {
                return score(player);
            }
        }
        let can_win = (0..NUM_CELLS).filter(|&pos| board[pos] == 0).any(|pos| {
            let mut next = board;
            next[pos] = turn.cell();
            has_line_through(&next, BOARD_SIZE, pos, BOARD_SIZE)
        });
        if can_win {
            score(turn)
        } else {
            0.0
        }
    }
}

fn has_line(board: &[u8; NUM_CELLS], player: Player) -> bool {
    (0..NUM_CELLS)
        .any(|pos| board[pos] == player.cell() && has_line_through(board, BOARD_SIZE, pos, BOARD_SIZE))
}

fn score(player: Player) -> f32 {
    match player {
        Player::P1 => 1.0,
        Player::P2 => -1.0,
    }
}

impl Network for WinOracleNetwork {
    fn name(&self) -> &str {
        "win-oracle"
    }

    fn action_size(&self) -> usize {
        NUM_CELLS
    }

    fn evaluate_batch(&self, features: &[Vec<f32>]) -> Result<Vec<NetworkOutput>, EvaluatorError> {
        Ok(features
            .iter()
            .map(|f| NetworkOutput::from_logits(vec![0.0; NUM_CELLS], Self::value(f)))
            .collect())
    }
}
