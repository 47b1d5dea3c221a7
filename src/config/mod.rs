// src/config/mod.rs

//! Configuration loading and validation for calcdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and apply environment overrides (`loader.rs`).
//! - Validate value ranges (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    apply_env_overrides, load_and_validate, load_effective, load_effective_raw, load_from_path,
};
pub use model::{
    ConfigFile, RawConfigFile, SchedulerSection, SchedulerSettings, TimingsSection,
    WorkerSettings, WorkersSection,
};
pub use validate::validate_config;
