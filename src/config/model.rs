// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::config::validate::validate_config;
use crate::errors::CalcdagError;
use crate::types::OperationTimings;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [workers]
/// count = 4
/// idle_poll_ms = 1000
///
/// [timings]
/// addition_ms = 1000
/// division_ms = 2000
///
/// [scheduler]
/// lease_timeout_ms = 30000
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub workers: WorkersSection,

    #[serde(default)]
    pub timings: TimingsSection,

    #[serde(default)]
    pub scheduler: SchedulerSection,
}

/// `[workers]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkersSection {
    /// Number of concurrent worker loops.
    #[serde(default = "default_worker_count")]
    pub count: usize,

    /// Sleep between claim attempts when no task is ready.
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,

    /// Sleep after a claim that failed for a reason other than "no task".
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,

    /// Attempts per call to the scheduler when the transport fails.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between those attempts.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Whether workers sleep for a task's estimated duration before
    /// computing it.
    #[serde(default = "default_simulate_latency")]
    pub simulate_latency: bool,
}

fn default_worker_count() -> usize {
    1
}

fn default_idle_poll_ms() -> u64 {
    1000
}

fn default_error_backoff_ms() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_simulate_latency() -> bool {
    true
}

impl Default for WorkersSection {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
            idle_poll_ms: default_idle_poll_ms(),
            error_backoff_ms: default_error_backoff_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            simulate_latency: default_simulate_latency(),
        }
    }
}

/// `[timings]` section: estimated duration per operation, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct TimingsSection {
    #[serde(default = "default_additive_ms")]
    pub addition_ms: u64,
    #[serde(default = "default_additive_ms")]
    pub subtraction_ms: u64,
    #[serde(default = "default_multiplicative_ms")]
    pub multiplication_ms: u64,
    #[serde(default = "default_multiplicative_ms")]
    pub division_ms: u64,
}

fn default_additive_ms() -> u64 {
    1000
}

fn default_multiplicative_ms() -> u64 {
    2000
}

impl Default for TimingsSection {
    fn default() -> Self {
        Self {
            addition_ms: default_additive_ms(),
            subtraction_ms: default_additive_ms(),
            multiplication_ms: default_multiplicative_ms(),
            division_ms: default_multiplicative_ms(),
        }
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// How long a claimed task may stay unreported before it is handed out
    /// again. `0` disables leases.
    #[serde(default = "default_lease_timeout_ms")]
    pub lease_timeout_ms: u64,

    /// How often expired leases are swept.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

fn default_lease_timeout_ms() -> u64 {
    30_000
}

fn default_sweep_interval_ms() -> u64 {
    1000
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            lease_timeout_ms: default_lease_timeout_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

/// Validated configuration with durations resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub workers: WorkerSettings,
    pub timings: OperationTimings,
    pub scheduler: SchedulerSettings,
}

/// Settings every worker loop runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSettings {
    pub count: usize,
    pub idle_poll: Duration,
    pub error_backoff: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub simulate_latency: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    pub lease_timeout: Option<Duration>,
    pub sweep_interval: Duration,
}

impl Default for ConfigFile {
    fn default() -> Self {
        // The default raw config always validates.
        Self::from_validated(&RawConfigFile::default())
    }
}

impl ConfigFile {
    fn from_validated(raw: &RawConfigFile) -> Self {
        let w = &raw.workers;
        let t = &raw.timings;
        let s = &raw.scheduler;

        Self {
            workers: WorkerSettings {
                count: w.count,
                idle_poll: Duration::from_millis(w.idle_poll_ms),
                error_backoff: Duration::from_millis(w.error_backoff_ms),
                max_retries: w.max_retries,
                retry_delay: Duration::from_millis(w.retry_delay_ms),
                simulate_latency: w.simulate_latency,
            },
            timings: OperationTimings {
                addition: Duration::from_millis(t.addition_ms),
                subtraction: Duration::from_millis(t.subtraction_ms),
                multiplication: Duration::from_millis(t.multiplication_ms),
                division: Duration::from_millis(t.division_ms),
            },
            scheduler: SchedulerSettings {
                lease_timeout: (s.lease_timeout_ms > 0)
                    .then(|| Duration::from_millis(s.lease_timeout_ms)),
                sweep_interval: Duration::from_millis(s.sweep_interval_ms),
            },
        }
    }
}

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CalcdagError;

    fn try_from(raw: RawConfigFile) -> Result<Self, Self::Error> {
        validate_config(&raw).map_err(|e| CalcdagError::ConfigError(format!("{e:#}")))?;
        Ok(Self::from_validated(&raw))
    }
}
