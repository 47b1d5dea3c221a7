// src/config/validate.rs

use anyhow::{Result, anyhow};

use crate::config::model::RawConfigFile;

/// Upper bound on `[workers].count`.
pub const MAX_WORKERS: usize = 1024;

/// Run basic semantic validation against a loaded configuration.
///
/// This checks:
/// - `1 <= workers.count <= MAX_WORKERS`
/// - `workers.max_retries >= 1`
/// - `workers.idle_poll_ms > 0` (an idle worker must sleep between claims)
/// - `scheduler.sweep_interval_ms > 0` when leases are enabled
/// - with simulated latency on, a lease outlasts the slowest operation
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_workers(cfg)?;
    validate_scheduler(cfg)?;
    Ok(())
}

fn validate_workers(cfg: &RawConfigFile) -> Result<()> {
    let w = &cfg.workers;

    if w.count == 0 {
        return Err(anyhow!("[workers].count must be >= 1 (got 0)"));
    }
    if w.count > MAX_WORKERS {
        return Err(anyhow!(
            "[workers].count must be <= {MAX_WORKERS} (got {})",
            w.count
        ));
    }
    if w.max_retries == 0 {
        return Err(anyhow!("[workers].max_retries must be >= 1 (got 0)"));
    }
    if w.idle_poll_ms == 0 {
        return Err(anyhow!("[workers].idle_poll_ms must be > 0"));
    }

    Ok(())
}

fn validate_scheduler(cfg: &RawConfigFile) -> Result<()> {
    let s = &cfg.scheduler;

    if s.lease_timeout_ms > 0 && s.sweep_interval_ms == 0 {
        return Err(anyhow!(
            "[scheduler].sweep_interval_ms must be > 0 when lease_timeout_ms is set"
        ));
    }

    let slowest = slowest_operation_ms(cfg);
    if s.lease_timeout_ms > 0 && cfg.workers.simulate_latency && s.lease_timeout_ms <= slowest {
        return Err(anyhow!(
            "[scheduler].lease_timeout_ms must exceed the slowest [timings] value \
             ({slowest} ms, got {})",
            s.lease_timeout_ms
        ));
    }

    Ok(())
}

fn slowest_operation_ms(cfg: &RawConfigFile) -> u64 {
    let t = &cfg.timings;
    [t.addition_ms, t.subtraction_ms, t.multiplication_ms, t.division_ms]
        .into_iter()
        .max()
        .unwrap_or(0)
}
