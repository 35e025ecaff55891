//! Shared helpers for square two-player board games.
//!
//! Board cells use the encoding of [`Player::cell`]: 0 = empty, 1 = P1, 2 = P2.

use crate::action::Player;

/// One of the eight symmetries of a square board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    Identity,
    Rotate90,
    Rotate180,
    Rotate270,
    HorizontalFlip,
    HorizontalFlipRotate90,
    HorizontalFlipRotate180,
    HorizontalFlipRotate270,
}

impl Rotation {
    pub const ALL: [Rotation; 8] = [
        Rotation::Identity,
        Rotation::Rotate90,
        Rotation::Rotate180,
        Rotation::Rotate270,
        Rotation::HorizontalFlip,
        Rotation::HorizontalFlipRotate90,
        Rotation::HorizontalFlipRotate180,
        Rotation::HorizontalFlipRotate270,
    ];

    /// Map a position on a `size x size` board through this symmetry.
    pub fn transform(self, pos: usize, size: usize) -> usize {
        let (row, col) = (pos / size, pos % size);
        let last = size - 1;
        let (row, col) = match self {
            Rotation::Identity => (row, col),
            Rotation::Rotate90 => (col, last - row),
            Rotation::Rotate180 => (last - row, last - col),
            Rotation::Rotate270 => (last - col, row),
            Rotation::HorizontalFlip => (row, last - col),
            Rotation::HorizontalFlipRotate90 => (last - col, last - row),
            Rotation::HorizontalFlipRotate180 => (last - row, col),
            Rotation::HorizontalFlipRotate270 => (col, row),
        };
        row * size + col
    }

    /// The symmetry that undoes this one.
    pub fn inverse(self) -> Rotation {
        match self {
            Rotation::Rotate90 => Rotation::Rotate270,
            Rotation::Rotate270 => Rotation::Rotate90,
            other => other,
        }
    }
}

/// Number of feature planes produced by [`plane_features`].
pub const NUM_FEATURE_PLANES: usize = 4;

/// Encode a board as four `size x size` planes.
///
/// Planes: P1 stones, P2 stones, all-ones if P1 is to move, all-ones if P2
/// is to move. Positions are mapped through `rotation`.
pub fn plane_features(board: &[u8], size: usize, turn: Player, rotation: Rotation) -> Vec<f32> {
    let area = size * size;
    let mut features = vec![0.0; NUM_FEATURE_PLANES * area];

    for (pos, &cell) in board.iter().enumerate().take(area) {
        let target = rotation.transform(pos, size);
        match Player::from_cell(cell) {
            Some(Player::P1) => features[target] = 1.0,
            Some(Player::P2) => features[area + target] = 1.0,
            None => {}
        }
    }

    let turn_plane = match turn {
        Player::P1 => 2,
        Player::P2 => 3,
    };
    features[turn_plane * area..(turn_plane + 1) * area].fill(1.0);
    features
}

/// Whether the stone at `pos` is part of a run of at least `length` equal stones.
pub fn has_line_through(board: &[u8], size: usize, pos: usize, length: usize) -> bool {
    let cell = board[pos];
    if cell == 0 {
        return false;
    }

    const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];
    let (row, col) = ((pos / size) as isize, (pos % size) as isize);
    let in_bounds = |r: isize, c: isize| r >= 0 && c >= 0 && r < size as isize && c < size as isize;

    DIRECTIONS.iter().any(|&(dr, dc)| {
        let mut run = 1;
        for sign in [1isize, -1] {
            let (mut r, mut c) = (row + sign * dr, col + sign * dc);
            while in_bounds(r, c) && board[(r as usize) * size + c as usize] == cell {
                run += 1;
                r += sign * dr;
                c += sign * dc;
            }
        }
        run >= length
    })
}

/// Render a board with one character per cell, rows top to bottom.
pub fn render_board(board: &[u8], size: usize, symbols: [char; 3]) -> String {
    let mut out = String::with_capacity(size * (size + 1));
    for row in board.chunks(size) {
        for &cell in row {
            out.push(symbols[cell.min(2) as usize]);
        }
        out.push('\n');
    }
    out
}
