// src/logging.rs

//! Logging setup for `calcdag` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `CALCDAG_LOG` environment variable, either a bare level ("info") or
//!    `EnvFilter` directives ("warn,calcdag::dag=debug")
//! 3. default to `warn`
//!
//! Logs are sent to STDERR so that stdout carries only expression results.

use anyhow::{Result, anyhow};
use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable consulted when `--log-level` is absent.
pub const LOG_ENV: &str = "CALCDAG_LOG";

/// Initialise the global logging subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let (filter, rejected) = build_filter(cli_level, env_value.as_deref());

    // Send logs to stderr; keep stdout free for results.
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))?;

    if let Some(value) = rejected {
        warn!(value = %value, "ignoring invalid {}; using the default level", LOG_ENV);
    }
    Ok(())
}

/// Build the log filter from the CLI flag and the raw `CALCDAG_LOG` value.
///
/// Returns the env value alongside the default filter when it could not be
/// parsed, so the caller can report it once logging is up.
pub fn build_filter(
    cli_level: Option<LogLevel>,
    env_value: Option<&str>,
) -> (EnvFilter, Option<String>) {
    if let Some(lvl) = cli_level {
        return (level_filter(level_from_log_level(lvl)), None);
    }

    let Some(value) = env_value.map(str::trim).filter(|v| !v.is_empty()) else {
        return (default_filter(), None);
    };

    if let Some(level) = parse_level_str(value) {
        return (level_filter(level), None);
    }
    match EnvFilter::try_new(value) {
        Ok(filter) => (filter, None),
        Err(_) => (default_filter(), Some(value.to_string())),
    }
}

fn default_filter() -> EnvFilter {
    level_filter(tracing::Level::WARN)
}

fn level_filter(level: tracing::Level) -> EnvFilter {
    EnvFilter::default().add_directive(LevelFilter::from_level(level).into())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

/// Parse a bare level name; `warning` is accepted for `warn`.
pub fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
