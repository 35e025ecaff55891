//! Command-line configuration for the actor binary.
//!
//! Search settings live in the key/value configuration owned by
//! `engine-config` (file, `PROOFTREE_*` environment, then `--conf-str`).
//! The flags here only pick the mode, the game, and the process setup.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use engine_config::SelfPlayConfig;
use mcts::{ActionSelection, MctsConfig, RootNoise, SearchVariant};
use tracing::level_filters::LevelFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Many concurrent games, one record per finished game on stdout
    #[value(name = "selfplay")]
    SelfPlay,
    /// One game on a single actor, printing the board after each move
    Console,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnvId {
    #[value(name = "tictactoe")]
    TicTacToe,
    Gomoku,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "actor")]
#[command(about = "Prooftree actor - parallel MCTS self-play")]
#[command(
    long_about = "Runs batched MCTS self-play and writes one game record per line to stdout.

Search settings are read from the config file with PROOFTREE_<KEY> environment
overrides, then --conf-str overrides. Use --gen to write a default config file."
)]
pub struct Config {
    /// What to run
    #[arg(long, value_enum, default_value_t = Mode::SelfPlay)]
    pub mode: Mode,

    /// Configuration file (defaults to PROOFTREE_CONFIG, then ./config.toml)
    #[arg(long)]
    pub conf_file: Option<PathBuf>,

    /// Overrides as `key=value:key=value`
    #[arg(long)]
    pub conf_str: Option<String>,

    /// Write a default configuration file to this path and exit
    #[arg(long = "gen")]
    pub gen_path: Option<PathBuf>,

    /// Game to play
    #[arg(long, value_enum, default_value_t = EnvId::TicTacToe)]
    pub env_id: EnvId,

    /// Number of network devices (one batch evaluator each)
    #[arg(long, default_value_t = 1)]
    pub num_devices: usize,

    /// Stop after this many finished games (unlimited if unset)
    #[arg(long)]
    pub max_games: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "PROOFTREE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.num_devices == 0 {
            return Err(anyhow!("num_devices must be greater than 0"));
        }

        if self.max_games == Some(0) {
            return Err(anyhow!("max_games must be greater than 0 when set"));
        }

        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(anyhow!(
                "invalid log level '{}', expected one of trace, debug, info, warn, error",
                self.log_level
            ));
        }

        Ok(())
    }
}

/// Translate validated key/value settings into a search configuration.
pub fn to_mcts_config(config: &SelfPlayConfig) -> MctsConfig {
    let action_selection = if config.actor_select_action_by_count {
        ActionSelection::ByCount
    } else {
        ActionSelection::BySoftmaxCount {
            temperature: config.actor_select_action_softmax_temperature as f32,
        }
    };

    let root_noise = if config.actor_use_dirichlet_noise {
        RootNoise::Dirichlet {
            alpha: config.actor_dirichlet_noise_alpha as f32,
            epsilon: config.actor_dirichlet_noise_epsilon as f32,
        }
    } else if config.actor_use_gumbel_noise {
        RootNoise::Gumbel
    } else {
        RootNoise::None
    };

    let variant = if config.actor_use_proof_cost_backup {
        SearchVariant::ProofCost
    } else {
        SearchVariant::AlphaZero
    };

    MctsConfig {
        num_simulation: config.actor_num_simulation,
        puct_init: config.actor_mcts_puct_init as f32,
        puct_base: config.actor_mcts_puct_base as f32,
        action_selection,
        root_noise,
        variant,
        value_size: config.nn_value_size,
        resign_threshold: config.actor_resign_threshold.map(|t| t as f32),
        ..MctsConfig::default()
    }
}
