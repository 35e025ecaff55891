//! Default configuration values loaded from config.defaults.toml.
//!
//! The file is embedded at compile time so the binary, the generated config,
//! and the tests agree on every default.

use once_cell::sync::Lazy;

use crate::SelfPlayConfig;

/// The embedded defaults TOML file (loaded at compile time)
pub const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed defaults (parsed once at first use)
static DEFAULTS: Lazy<SelfPlayConfig> = Lazy::new(|| {
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

pub fn defaults() -> &'static SelfPlayConfig {
    &DEFAULTS
}
