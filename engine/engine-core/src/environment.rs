//! The environment contract the search runs against.

use std::fmt;

use crate::action::{Action, Player};
use crate::board_game::Rotation;
use crate::record::GameRecord;

/// A copyable game position together with its action history.
///
/// The search clones the environment and replays selected paths on the copy;
/// it never mutates the position it was handed. `Display` renders the board
/// for logs and console play.
pub trait Environment: Clone + Send + fmt::Display {
    /// Short game identifier, e.g. `"tictactoe"`.
    fn name(&self) -> &'static str;

    /// Side length of the (square) board.
    fn board_size(&self) -> usize;

    /// Length of the policy vector the network produces for this game.
    fn policy_size(&self) -> usize;

    /// Return to the initial position and clear the history.
    fn reset(&mut self);

    /// Play `action`. Returns `false` and leaves the position untouched if
    /// the action is illegal.
    fn act(&mut self, action: Action) -> bool;

    fn is_legal_action(&self, action: Action) -> bool;

    /// All legal actions for the player to move, in id order.
    fn legal_actions(&self) -> Vec<Action> {
        let turn = self.turn();
        (0..self.policy_size())
            .map(|id| Action::new(id, turn))
            .filter(|&action| self.is_legal_action(action))
            .collect()
    }

    fn action_history(&self) -> &[Action];

    fn is_terminal(&self) -> bool;

    /// Player to move.
    fn turn(&self) -> Player;

    /// Outcome from P1's perspective: +1 P1 win, -1 P2 win, 0 otherwise.
    ///
    /// With `is_resign` the player to move is scored as having lost.
    fn eval_score(&self, is_resign: bool) -> f32;

    /// Network input for the current position under `rotation`.
    fn features(&self, rotation: Rotation) -> Vec<f32>;

    /// One-line game record with the given header tags.
    fn record(&self, comments: &[String], tags: &[(&str, String)]) -> String {
        let mut record =
            GameRecord::from_history(self.name(), self.board_size(), self.action_history(), comments);
        for (key, value) in tags {
            record.set_tag(key, value.clone());
        }
        record.to_string()
    }
}

/// Score for a resigned game: the player to move loses.
pub fn resign_score(turn: Player) -> f32 {
    match turn {
        Player::P1 => -1.0,
        Player::P2 => 1.0,
    }
}
