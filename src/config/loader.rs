// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable overriding `[workers].count`.
pub const WORKERS_ENV: &str = "COMPUTING_POWER";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve and validate the configuration the binary runs with.
///
/// See [`load_effective_raw`] for the lookup order.
pub fn load_effective(path: Option<&Path>) -> Result<ConfigFile> {
    ConfigFile::try_from(load_effective_raw(path)?)
}

/// Resolve the raw configuration, before validation.
///
/// - An explicit `path` must exist.
/// - Without one, [`default_config_path`] is used if present, otherwise the
///   built-in defaults.
/// - `COMPUTING_POWER` then overrides the worker count.
pub fn load_effective_raw(path: Option<&Path>) -> Result<RawConfigFile> {
    let mut raw = match path {
        Some(path) => load_from_path(path)?,
        None => {
            let default_path = default_config_path();
            if default_path.is_file() {
                debug!(path = ?default_path, "loading default config file");
                load_from_path(&default_path)?
            } else {
                debug!("no config file; using built-in defaults");
                RawConfigFile::default()
            }
        }
    };

    apply_env_overrides(&mut raw, |key| std::env::var(key).ok());
    Ok(raw)
}

/// Apply environment overrides using `lookup` to read variables.
///
/// An unparsable or zero `COMPUTING_POWER` is ignored, keeping the
/// configured value.
pub fn apply_env_overrides(raw: &mut RawConfigFile, lookup: impl Fn(&str) -> Option<String>) {
    let Some(value) = lookup(WORKERS_ENV) else {
        return;
    };

    match value.trim().parse::<usize>() {
        Ok(count) if count >= 1 => {
            debug!(count, "worker count taken from {}", WORKERS_ENV);
            raw.workers.count = count;
        }
        _ => warn!(
            value = %value,
            "ignoring invalid {} (expected a positive integer)",
            WORKERS_ENV
        ),
    }
}

/// Config file looked up when `--config` is not given.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Calcdag.toml")
}
