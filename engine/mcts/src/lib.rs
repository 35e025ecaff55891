//! Monte Carlo Tree Search with PUCT selection and proof-cost backup.
//!
//! This crate provides the search half of the self-play engine. It works with
//! any game implementing the `engine-core` [`Environment`](engine_core::Environment)
//! trait, but never drives the game itself: the caller replays selected paths
//! and feeds network outputs back in. That split is what lets many trees share
//! one batched network call.
//!
//! # Overview
//!
//! Each simulation consists of four steps:
//!
//! 1. **Selection**: [`MctsTree::select`] walks from the root by PUCT, with
//!    Q-values rescaled into `[-1, 1]` by the [`ValueMap`]
//! 2. **Evaluation**: the caller pushes the leaf's features into a
//!    [`BatchEvaluator`] and runs [`BatchEvaluator::forward`]
//! 3. **Expansion**: [`MctsTree::expand`] installs the legal candidates
//! 4. **Backup**: [`MctsTree::backup`] updates counts and means along the path
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcts::{BatchEvaluator, Candidate, MctsConfig, MctsTree, UniformNetwork};
//!
//! let evaluator = BatchEvaluator::new(UniformNetwork::new(9));
//! let mut tree = MctsTree::new(MctsConfig::for_testing(), 9);
//!
//! while !tree.is_search_done() {
//!     let path = tree.select();
//!     // replay `path` on a copy of the game, then:
//!     let slot = evaluator.push_back(features);
//!     let output = &evaluator.forward()?[slot];
//!     tree.expand(*path.last().unwrap(), &candidates)?;
//!     tree.backup(&path, output.value);
//! }
//! ```
//!
//! # Configuration
//!
//! The [`MctsConfig`] struct controls search behavior:
//!
//! - `num_simulation`: Number of simulations per move (default: 50)
//! - `puct_init`, `puct_base`: PUCT exploration schedule (default: 1.25, 19652)
//! - `action_selection`: argmax count or softmax-count sampling at the root
//! - `root_noise`: Dirichlet or Gumbel noise on the root priors
//! - `variant`: AlphaZero values or proof-cost bins
//!
//! # Networks
//!
//! - [`UniformNetwork`]: uniform policy and a constant value (for testing)
//! - `OnnxNetwork`: ONNX Runtime inference, behind the `onnx` feature

pub mod arena;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod node;
pub mod noise;
pub mod random;
pub mod tree;
pub mod value_map;

#[cfg(feature = "onnx")]
pub mod onnx;

// Re-export main types
pub use arena::{ExtraDataSlab, NodeArena};
pub use config::{ActionSelection, MctsConfig, RootNoise, SearchVariant};
pub use error::SearchError;
pub use evaluator::{
    expected_value, softmax, BatchEvaluator, BatchStats, EvaluatorError, Network, NetworkOutput,
    UniformNetwork, ValueDistributions,
};
pub use node::{NodeId, SolverTag, TreeNode};
pub use noise::apply_root_noise;
pub use tree::{Candidate, LeafEvaluation, MctsTree, TreeStats, PROOF_COST_STEP};
pub use value_map::ValueMap;

#[cfg(feature = "onnx")]
pub use onnx::OnnxNetwork;
