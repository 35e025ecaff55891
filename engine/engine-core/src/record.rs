//! SGF-style game records.
//!
//! A record is a single line:
//!
//! ```text
//! (;GM[tictactoe]SZ[3]EV[uniform]RE[1];B[4]C[4:5,0:2];W[0])
//! ```
//!
//! Header tags come first, in insertion order, followed by one node per move.
//! Moves may carry a comment, which self-play uses for the root visit
//! distribution.

use std::fmt;

use crate::action::Action;

#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    tags: Vec<(String, String)>,
    moves: Vec<(Action, Option<String>)>,
}

impl GameRecord {
    pub fn new(game: &str, board_size: usize) -> Self {
        Self {
            tags: vec![
                ("GM".to_string(), game.to_string()),
                ("SZ".to_string(), board_size.to_string()),
            ],
            moves: Vec::new(),
        }
    }

    /// Build a record from an action history and optional per-move comments.
    ///
    /// `comments[i]` annotates `history[i]`; missing or empty comments are
    /// omitted.
    pub fn from_history(game: &str, board_size: usize, history: &[Action], comments: &[String]) -> Self {
        let mut record = Self::new(game, board_size);
        for (i, &action) in history.iter().enumerate() {
            let comment = comments.get(i).filter(|c| !c.is_empty()).cloned();
            record.push_move(action, comment);
        }
        record
    }

    /// Set a header tag, replacing any previous value for `key`.
    pub fn set_tag(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.tags.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.tags.push((key.to_string(), value)),
        }
    }

    pub fn with_tag(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_tag(key, value);
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn push_move(&mut self, action: Action, comment: Option<String>) {
        self.moves.push((action, comment));
    }

    pub fn num_moves(&self) -> usize {
        self.moves.len()
    }
}

/// Escape `]` and `\` inside an SGF property value.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == ']' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for GameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(;")?;
        for (key, value) in &self.tags {
            write!(f, "{}[{}]", key, escape(value))?;
        }
        for (action, comment) in &self.moves {
            write!(f, ";{}[{}]", action.player().to_char(), action.id())?;
            if let Some(comment) = comment {
                write!(f, "C[{}]", escape(comment))?;
            }
        }
        write!(f, ")")
    }
}
