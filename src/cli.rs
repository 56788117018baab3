// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::RunMode;

/// Command-line arguments for `dagrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dagrun",
    version,
    about = "Run shell commands as a dependency graph.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the graph file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Dagrun.toml")]
    pub config: String,

    /// Runner to use; overrides `[config].mode` from the graph file.
    #[arg(long, value_enum, value_name = "MODE")]
    pub mode: Option<RunMode>,

    /// Cancel still-running tasks as soon as any task fails; overrides
    /// `[config].on_failure`.
    #[arg(long)]
    pub cancel_on_failure: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAGRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the graph and its order, but don't run anything.
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

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
