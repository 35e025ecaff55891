//! Centralized self-play configuration.
//!
//! This crate owns the closed set of configuration keys recognised by the
//! search engine, their defaults, and the rules that reject contradictory
//! settings.
//!
//! # Configuration Priority
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Override string (`key=value:key=value`, the `--conf-str` flag)
//! 2. Environment variables (`PROOFTREE_<KEY>`)
//! 3. Config file (`--conf-file`, `PROOFTREE_CONFIG`, or `config.toml`)
//! 4. Built-in defaults (config.defaults.toml)
//!
//! ```text
//! PROOFTREE_<KEY>=value
//!
//! Examples:
//!     PROOFTREE_ACTOR_NUM_SIMULATION=400
//!     PROOFTREE_ACTOR_USE_GUMBEL_NOISE=true
//!     PROOFTREE_NN_FILE_NAME=/models/latest.onnx
//! ```

mod defaults;
mod error;
mod loader;
mod structs;

pub use defaults::{defaults, DEFAULTS_TOML};
pub use error::ConfigError;
pub use loader::{
    apply_conf_str, apply_env_overrides, apply_overrides, load_config, load_from_path,
    load_from_str, write_default_config, CONFIG_PATH_ENV, CONFIG_SEARCH_PATHS, ENV_PREFIX,
};
pub use structs::{key_kind, SelfPlayConfig, ValueKind, CONFIG_KEYS};
