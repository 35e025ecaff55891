//! Players and actions shared by every environment.

use std::fmt;

/// One of the two sides of a board game. `P1` always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Player {
    P1,
    P2,
}

impl Player {
    /// The opponent of this player.
    #[inline]
    pub fn next(self) -> Player {
        match self {
            Player::P1 => Player::P2,
            Player::P2 => Player::P1,
        }
    }

    /// Character used in game records (`B` moves first, `W` second).
    pub fn to_char(self) -> char {
        match self {
            Player::P1 => 'B',
            Player::P2 => 'W',
        }
    }

    /// Cell value used by board encodings: 1 for P1, 2 for P2.
    #[inline]
    pub fn cell(self) -> u8 {
        match self {
            Player::P1 => 1,
            Player::P2 => 2,
        }
    }

    /// Inverse of [`Player::cell`].
    pub fn from_cell(cell: u8) -> Option<Player> {
        match cell {
            1 => Some(Player::P1),
            2 => Some(Player::P2),
            _ => None,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// An immutable `(id, player)` pair.
///
/// The id indexes the environment's action space. Only the environment
/// interprets it; the search treats it as opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Action {
    id: usize,
    player: Player,
}

impl Action {
    pub fn new(id: usize, player: Player) -> Self {
        Self { id, player }
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// The player making this move.
    #[inline]
    pub fn player(&self) -> Player {
        self.player
    }

    /// Player to move after this action has been played.
    #[inline]
    pub fn next_player(&self) -> Player {
        self.player.next()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.player.to_char(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_alternates() {
        assert_eq!(Player::P1.next(), Player::P2);
        assert_eq!(Player::P2.next(), Player::P1);
        assert_eq!(Player::P1.next().next(), Player::P1);
    }

    #[test]
    fn test_player_cells_round_trip() {
        for player in [Player::P1, Player::P2] {
            assert_eq!(Player::from_cell(player.cell()), Some(player));
        }
        assert_eq!(Player::from_cell(0), None);
        assert_eq!(Player::from_cell(3), None);
    }

    #[test]
    fn test_action_accessors() {
        let action = Action::new(4, Player::P2);
        assert_eq!(action.id(), 4);
        assert_eq!(action.player(), Player::P2);
        assert_eq!(action.next_player(), Player::P1);
        assert_eq!(action.to_string(), "W[4]");
    }
}
