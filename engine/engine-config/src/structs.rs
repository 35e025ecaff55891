//! Configuration struct definitions.
//!
//! The key set is closed: deserialization rejects anything not listed in
//! [`CONFIG_KEYS`].

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::ConfigError;

/// How a configuration value is parsed from strings (`conf_str`, env vars).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Str,
}

/// Every recognised key and the kind of value it takes.
pub const CONFIG_KEYS: &[(&str, ValueKind)] = &[
    ("auto_seed", ValueKind::Bool),
    ("seed", ValueKind::Int),
    ("actor_num_threads", ValueKind::Int),
    ("actor_num_parallel_games", ValueKind::Int),
    ("actor_num_simulation", ValueKind::Int),
    ("actor_mcts_puct_base", ValueKind::Float),
    ("actor_mcts_puct_init", ValueKind::Float),
    ("actor_select_action_by_count", ValueKind::Bool),
    ("actor_select_action_by_softmax_count", ValueKind::Bool),
    ("actor_select_action_softmax_temperature", ValueKind::Float),
    ("actor_use_dirichlet_noise", ValueKind::Bool),
    ("actor_dirichlet_noise_alpha", ValueKind::Float),
    ("actor_dirichlet_noise_epsilon", ValueKind::Float),
    ("actor_use_gumbel_noise", ValueKind::Bool),
    ("actor_use_proof_cost_backup", ValueKind::Bool),
    ("actor_resign_threshold", ValueKind::Float),
    ("nn_file_name", ValueKind::Str),
    ("nn_value_size", ValueKind::Int),
];

/// Look up the value kind of a configuration key.
pub fn key_kind(key: &str) -> Option<ValueKind> {
    CONFIG_KEYS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|&(_, kind)| kind)
}

/// Self-play configuration.
///
/// Field names are the configuration keys. All fields except
/// `actor_resign_threshold` are required when deserializing directly; use
/// [`crate::load_from_str`] to layer a partial file over the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelfPlayConfig {
    /// Seed every worker from OS entropy instead of `seed`
    pub auto_seed: bool,
    /// Base worker seed. TOML integers are signed, so at most `i64::MAX`.
    pub seed: u64,

    /// Worker threads; raised to the number of devices if lower
    pub actor_num_threads: u32,
    /// Number of concurrently played games (actors)
    pub actor_num_parallel_games: u32,
    /// Simulations per move
    pub actor_num_simulation: u32,
    pub actor_mcts_puct_base: f64,
    pub actor_mcts_puct_init: f64,
    pub actor_select_action_by_count: bool,
    pub actor_select_action_by_softmax_count: bool,
    pub actor_select_action_softmax_temperature: f64,
    pub actor_use_dirichlet_noise: bool,
    pub actor_dirichlet_noise_alpha: f64,
    pub actor_dirichlet_noise_epsilon: f64,
    pub actor_use_gumbel_noise: bool,
    /// Back up proof costs over a `nn_value_size` value range instead of
    /// plain game outcomes
    pub actor_use_proof_cost_backup: bool,
    /// Resign when the root value for the side to move drops below this.
    /// Absent means never resign.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_resign_threshold: Option<f64>,

    /// Model file; empty selects the built-in uniform network
    pub nn_file_name: String,
    /// Number of bins in the value distribution (V)
    pub nn_value_size: u32,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        defaults::defaults().clone()
    }
}

impl SelfPlayConfig {
    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if i64::try_from(self.seed).is_err() {
            return Err(invalid("seed must be at most 9223372036854775807"));
        }
        if self.actor_num_simulation == 0 {
            return Err(invalid("actor_num_simulation must be greater than 0"));
        }
        if self.actor_num_parallel_games == 0 {
            return Err(invalid("actor_num_parallel_games must be greater than 0"));
        }
        if self.actor_num_threads == 0 {
            return Err(invalid("actor_num_threads must be greater than 0"));
        }
        if !(self.actor_mcts_puct_init > 0.0) {
            return Err(invalid("actor_mcts_puct_init must be greater than 0"));
        }
        if !(self.actor_mcts_puct_base > 0.0) {
            return Err(invalid("actor_mcts_puct_base must be greater than 0"));
        }
        if self.actor_select_action_by_count == self.actor_select_action_by_softmax_count {
            return Err(invalid(
                "exactly one of actor_select_action_by_count and \
                 actor_select_action_by_softmax_count must be true",
            ));
        }
        if !(self.actor_select_action_softmax_temperature > 0.0) {
            return Err(invalid(
                "actor_select_action_softmax_temperature must be greater than 0",
            ));
        }
        if self.actor_use_dirichlet_noise && self.actor_use_gumbel_noise {
            return Err(invalid(
                "actor_use_dirichlet_noise and actor_use_gumbel_noise are mutually exclusive",
            ));
        }
        if !(self.actor_dirichlet_noise_alpha > 0.0) {
            return Err(invalid("actor_dirichlet_noise_alpha must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.actor_dirichlet_noise_epsilon) {
            return Err(invalid("actor_dirichlet_noise_epsilon must be within [0, 1]"));
        }
        if let Some(threshold) = self.actor_resign_threshold {
            if !(-1.0..=1.0).contains(&threshold) {
                return Err(invalid("actor_resign_threshold must be within [-1, 1]"));
            }
        }
        if self.nn_value_size == 0 {
            return Err(invalid("nn_value_size must be greater than 0"));
        }
        Ok(())
    }

    /// Serialize as a complete, editable TOML file.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}
