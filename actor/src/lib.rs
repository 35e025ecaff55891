//! Prooftree actors: self-play search on top of the `mcts` crate.
//!
//! - [`Actor`]: one game and one search tree, split around network calls
//! - [`ActorGroup`]: many actors sharing batch evaluators through a two-phase
//!   worker pool
//! - [`config`]: command-line flags and the translation to [`mcts::MctsConfig`]

pub mod actor;
pub mod actor_group;
pub mod config;
pub mod network;

pub use actor::Actor;
pub use actor_group::{ActorGroup, GroupError, GroupOptions, GroupSummary, RunLimits};
pub use config::{to_mcts_config, Config, EnvId, Mode};
pub use network::{load_networks, AnyNetwork};
