//! Core types for Prooftree games.
//!
//! This crate defines what the search needs from a game and nothing more:
//! - [`Player`] and [`Action`]: the `(id, player)` moves
//! - [`Environment`]: a cloneable position with rules, features, and history
//! - [`Rotation`] and board helpers shared by square board games
//! - [`GameRecord`]: the one-line SGF-style record emitted for finished games

pub mod action;
pub mod board_game;
pub mod environment;
pub mod record;

pub use action::{Action, Player};
pub use board_game::{has_line_through, plane_features, render_board, Rotation, NUM_FEATURE_PLANES};
pub use environment::{resign_score, Environment};
pub use record::GameRecord;
