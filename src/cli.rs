// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::config::validate::MAX_WORKERS;

/// Command-line arguments for `calcdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "calcdag",
    version,
    about = "Evaluate arithmetic expressions as DAGs of tasks run by a worker pool.",
    long_about = None
)]
pub struct CliArgs {
    /// Expressions to evaluate, e.g. "(2+3)*4".
    ///
    /// If none are given, expressions are read from stdin, one per line.
    #[arg(value_name = "EXPR")]
    pub expressions: Vec<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Calcdag.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Number of worker loops (overrides config and `COMPUTING_POWER`).
    #[arg(long, short = 'w', value_name = "N", value_parser = clap::value_parser!(u16).range(1..=MAX_WORKERS as i64))]
    pub workers: Option<u16>,

    /// Skip the simulated per-operation latency.
    #[arg(long)]
    pub no_latency: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CALCDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Compile and print each task graph, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
