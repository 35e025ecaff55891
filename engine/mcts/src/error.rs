use thiserror::Error;

use crate::evaluator::EvaluatorError;

/// Errors that abort a search. None of them are recoverable mid-search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("node arena exhausted: requested {requested} nodes with {used} of {capacity} in use")]
    ArenaExhausted {
        requested: usize,
        used: usize,
        capacity: usize,
    },

    #[error("illegal action {action} while replaying the selected path")]
    IllegalActionOnReplay { action: engine_core::Action },

    #[error("illegal action {action} for the current position")]
    IllegalAction { action: engine_core::Action },

    #[error("no legal actions at a non-terminal position")]
    NoLegalActions,

    #[error("search finished without a selectable root action")]
    NoSearchAction,

    #[error("no pending network evaluation")]
    NoPendingEvaluation,

    #[error("Evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),
}
