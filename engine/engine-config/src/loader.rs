//! Configuration loading logic.
//!
//! Layers, lowest to highest priority: built-in defaults, a config file,
//! `PROOFTREE_<KEY>` environment variables, then a `key=value:key=value`
//! override string from the command line.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::structs::{key_kind, ValueKind, CONFIG_KEYS};
use crate::{defaults, ConfigError, SelfPlayConfig};

/// Standard locations to search for config.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config.toml",    // Current directory
    "../config.toml", // Parent directory (when running from subdirectory)
];

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "PROOFTREE_CONFIG";

/// Prefix of per-key environment overrides, e.g. `PROOFTREE_ACTOR_NUM_SIMULATION`.
pub const ENV_PREFIX: &str = "PROOFTREE_";

/// Load, override, and validate the configuration.
///
/// With `path` set that file must exist. Otherwise the file named by
/// `PROOFTREE_CONFIG` or the first of [`CONFIG_SEARCH_PATHS`] that exists is
/// used, falling back to the built-in defaults.
pub fn load_config(path: Option<&Path>, conf_str: Option<&str>) -> Result<SelfPlayConfig, ConfigError> {
    let config = match path.map(Path::to_path_buf).or_else(find_config_file) {
        Some(path) => {
            info!("Loading config from {}", path.display());
            load_from_path(&path)?
        }
        None => {
            debug!("No config.toml found, using built-in defaults");
            SelfPlayConfig::default()
        }
    };

    let mut config = apply_env_overrides(config)?;
    if let Some(conf_str) = conf_str {
        config = apply_conf_str(config, conf_str)?;
    }
    config.validate()?;
    Ok(config)
}

fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }
    CONFIG_SEARCH_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

/// Load a config file, filling absent keys from the defaults.
pub fn load_from_path(path: &Path) -> Result<SelfPlayConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&content)
}

/// Parse TOML content, filling absent keys from the defaults.
pub fn load_from_str(content: &str) -> Result<SelfPlayConfig, ConfigError> {
    let table: toml::Table = content
        .parse()
        .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;
    overlay(defaults::defaults(), table)
}

/// Apply a `key=value:key=value` override string.
pub fn apply_conf_str(config: SelfPlayConfig, conf_str: &str) -> Result<SelfPlayConfig, ConfigError> {
    let mut pairs = Vec::new();
    for item in conf_str.split(':').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedOverride(item.to_string()))?;
        pairs.push((key.trim().to_string(), value.trim().to_string()));
    }
    apply_overrides(config, pairs)
}

/// Apply `PROOFTREE_<KEY>` environment variables.
pub fn apply_env_overrides(config: SelfPlayConfig) -> Result<SelfPlayConfig, ConfigError> {
    let pairs: Vec<(String, String)> = CONFIG_KEYS
        .iter()
        .filter_map(|(key, _)| {
            let var = format!("{}{}", ENV_PREFIX, key.to_uppercase());
            std::env::var(&var).ok().map(|value| {
                debug!(key, %var, "Applying environment override");
                (key.to_string(), value)
            })
        })
        .collect();
    apply_overrides(config, pairs)
}

/// Apply string-valued overrides, parsing each by its key's kind.
pub fn apply_overrides<I>(config: SelfPlayConfig, pairs: I) -> Result<SelfPlayConfig, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut table = toml::Table::new();
    for (key, raw) in pairs {
        let value = parse_value(&key, &raw)?;
        table.insert(key, value);
    }
    if table.is_empty() {
        return Ok(config);
    }
    overlay(&config, table)
}

/// Write the defaults as a complete config file.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let content = SelfPlayConfig::default().to_toml_string()?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_value(key: &str, raw: &str) -> Result<toml::Value, ConfigError> {
    let kind = key_kind(key).ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    let bad = |expected| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        expected,
    };
    Ok(match kind {
        ValueKind::Bool => toml::Value::Boolean(raw.parse().map_err(|_| bad("true or false"))?),
        ValueKind::Int => toml::Value::Integer(raw.parse().map_err(|_| bad("an integer"))?),
        ValueKind::Float => toml::Value::Float(raw.parse().map_err(|_| bad("a number"))?),
        ValueKind::Str => toml::Value::String(raw.to_string()),
    })
}

fn overlay(base: &SelfPlayConfig, overrides: toml::Table) -> Result<SelfPlayConfig, ConfigError> {
    let mut merged = match toml::Value::try_from(base) {
        Ok(toml::Value::Table(table)) => table,
        Ok(_) => return Err(ConfigError::Serialize("expected a table".to_string())),
        Err(e) => return Err(ConfigError::Serialize(e.to_string())),
    };
    for (key, value) in overrides {
        if key_kind(&key).is_none() {
            return Err(ConfigError::UnknownKey(key));
        }
        merged.insert(key, value);
    }
    toml::Value::Table(merged)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))
}
