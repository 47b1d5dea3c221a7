// src/lib.rs

pub mod cli;
pub mod compiler;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_effective_raw};
use crate::dag::{ExpressionRecord, TaskGraph};
use crate::engine::Orchestrator;
use crate::exec::{LocalTaskSource, WorkerPool};
use crate::types::{ExpressionId, ExpressionStatus};

/// How often `run` checks whether all submitted expressions have settled.
const SETTLE_POLL: Duration = Duration::from_millis(50);

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file, `COMPUTING_POWER`, CLI flags)
/// - compilation and submission of every expression
/// - the worker pool and the lease sweeper
/// - Ctrl-C handling
///
/// Prints one line per expression to stdout and fails if any expression
/// could not be evaluated.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = effective_config(&args)?;

    let sources = if args.expressions.is_empty() {
        read_stdin_lines().await?
    } else {
        args.expressions.clone()
    };

    if sources.is_empty() {
        info!("no expressions given; nothing to do");
        return Ok(());
    }

    if args.dry_run {
        return print_dry_run(&cfg, &sources);
    }

    let orchestrator = Orchestrator::new(&cfg);

    // Compile errors are reported immediately and never reach the workers.
    let mut submissions = Vec::with_capacity(sources.len());
    for source in &sources {
        let submission = match orchestrator.submit(source) {
            Ok(id) => Submission::Accepted(id),
            Err(err) => {
                warn!(source = %source, error = %err, "expression rejected");
                Submission::Rejected(err.to_string())
            }
        };
        submissions.push((source.trim().to_string(), submission));
    }

    let ids: Vec<ExpressionId> = submissions
        .iter()
        .filter_map(|(_, s)| match s {
            Submission::Accepted(id) => Some(*id),
            Submission::Rejected(_) => None,
        })
        .collect();

    let (sweeper_tx, sweeper_rx) = watch::channel(false);
    let sweeper = orchestrator.spawn_lease_sweeper(sweeper_rx);

    let source = Arc::new(LocalTaskSource::new(orchestrator.scheduler().clone()));
    let pool = WorkerPool::spawn(source, &cfg.workers);

    let interrupted = tokio::select! {
        settled = orchestrator.wait_until_settled(&ids, SETTLE_POLL) => {
            debug!(count = settled.len(), "all expressions settled");
            false
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                warn!(error = %err, "failed to listen for Ctrl+C");
            }
            warn!("interrupted; stopping workers");
            true
        }
    };

    pool.shutdown().await;
    let _ = sweeper_tx.send(true);
    if let Some(handle) = sweeper {
        if let Err(err) = handle.await {
            warn!(error = %err, "lease sweeper ended abnormally");
        }
    }

    let mut failures = 0usize;
    for (source, submission) in &submissions {
        match submission {
            Submission::Accepted(id) => match orchestrator.expression(*id) {
                Some(record) => {
                    if !print_record(source, &record) {
                        failures += 1;
                    }
                }
                None => {
                    println!("{source} : error: expression disappeared");
                    failures += 1;
                }
            },
            Submission::Rejected(reason) => {
                println!("{source} : error: {reason}");
                failures += 1;
            }
        }
    }

    if interrupted {
        bail!("interrupted before all expressions finished");
    }
    if failures > 0 {
        bail!("{failures} of {} expression(s) failed", submissions.len());
    }

    Ok(())
}

enum Submission {
    Accepted(ExpressionId),
    Rejected(String),
}

/// Load the config and layer CLI flags on top of it, validating the result.
fn effective_config(args: &CliArgs) -> Result<ConfigFile> {
    let mut raw = load_effective_raw(args.config.as_deref().map(Path::new))?;

    if let Some(workers) = args.workers {
        raw.workers.count = usize::from(workers);
    }
    if args.no_latency {
        raw.workers.simulate_latency = false;
    }

    let cfg = ConfigFile::try_from(raw)?;

    debug!(?cfg, "effective configuration");
    Ok(cfg)
}

/// Read non-blank lines from stdin until EOF.
async fn read_stdin_lines() -> Result<Vec<String>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut out = Vec::new();

    while let Some(line) = lines.next_line().await? {
        if !line.trim().is_empty() {
            out.push(line);
        }
    }

    Ok(out)
}

/// Print `<source> = <value>` or `<source> : error: <reason>`.
///
/// Returns `false` if the expression did not finish successfully.
fn print_record(source: &str, record: &ExpressionRecord) -> bool {
    match (record.status, record.result) {
        (ExpressionStatus::Done, Some(value)) => {
            println!("{source} = {value}");
            true
        }
        (ExpressionStatus::Error, _) => {
            let reason = record.error.as_deref().unwrap_or("unknown error");
            println!("{source} : error: {reason}");
            false
        }
        (status, _) => {
            println!("{source} : error: unfinished ({status})");
            false
        }
    }
}

/// Dry-run output: compile every expression and print its task graph.
fn print_dry_run(cfg: &ConfigFile, sources: &[String]) -> Result<()> {
    println!("calcdag dry-run");
    println!("  workers.count = {}", cfg.workers.count);
    println!("  workers.simulate_latency = {}", cfg.workers.simulate_latency);
    match cfg.scheduler.lease_timeout {
        Some(lease) => println!("  scheduler.lease_timeout_ms = {}", lease.as_millis()),
        None => println!("  scheduler.lease_timeout_ms = 0 (disabled)"),
    }
    println!();

    let mut failures = 0usize;
    for source in sources {
        let source = source.trim();
        match compiler::compile_with(source, &cfg.timings) {
            Ok(graph) => print_graph(source, &graph),
            Err(err) => {
                println!("{source} : error: {err}");
                failures += 1;
            }
        }
    }

    debug!("dry-run complete (no execution)");

    if failures > 0 {
        bail!("{failures} of {} expression(s) failed to compile", sources.len());
    }
    Ok(())
}

fn print_graph(source: &str, graph: &TaskGraph) {
    println!("{source}");
    println!("  tasks ({}), root {}:", graph.len(), graph.root());
    for task in graph.tasks() {
        println!(
            "    {}: {} {} {}  ({} ms)",
            task.id,
            task.lhs,
            task.operation,
            task.rhs,
            task.estimated_duration.as_millis()
        );
    }
}
