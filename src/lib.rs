// src/lib.rs

//! `dagrun`: run a dependency graph of sync and async work units.
//!
//! The core is [`dag`] (graph + readiness tracking) and [`engine`] (the
//! sequential, concurrent and mixed runners, failure aggregation and
//! cancellation). [`config`], [`exec`] and [`cli`] build the `dagrun`
//! binary on top: a TOML file of shell commands executed as a graph.

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::Graph;
use crate::engine::{RunnerOptions, run_graph};
use crate::errors::DagrunError;
use crate::exec::graph_from_config;
use crate::types::FailurePolicy;

pub use crate::engine::{run_concurrent, run_concurrent_mixed, run_sequential};

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the graph file, builds the graph, then runs it with
/// the selected runner. CLI flags win over the file's `[config]` section.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading graph file {}", config_path.display()))?;

    let graph = graph_from_config(&graph_name(&config_path), &cfg)?;

    if args.dry_run {
        print_dry_run(&graph, &cfg);
        return Ok(());
    }

    let mode = args.mode.unwrap_or(cfg.config.mode);
    let options = RunnerOptions {
        on_failure: if args.cancel_on_failure {
            FailurePolicy::CancelOutstanding
        } else {
            cfg.config.on_failure
        },
    };

    info!(
        graph = %graph.name(),
        nodes = graph.len(),
        ?mode,
        on_failure = ?options.on_failure,
        "running graph"
    );

    match run_graph(&graph, mode, options).await {
        Ok(()) => {
            info!(graph = %graph.name(), "all nodes completed");
            Ok(())
        }
        Err(err) => {
            for failure in err.failures() {
                error!(node = %failure.node(), error = %failure.cause(), "node failed");
            }
            Err(DagrunError::Run(err).into())
        }
    }
}

/// Graph display name: the config file stem, e.g. `Dagrun` for `Dagrun.toml`.
fn graph_name(config_path: &Path) -> String {
    config_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dagrun".to_string())
}

/// Print tasks, dependencies and the order a sequential run would use.
fn print_dry_run(graph: &Graph, cfg: &ConfigFile) {
    println!("dagrun dry-run: {}", graph.name());
    println!("  config.mode = {:?}", cfg.config.mode);
    println!("  config.on_failure = {:?}", cfg.config.on_failure);
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name}");
        println!("      cmd: {}", task.cmd);
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if task.effective_blocking(&cfg.default) {
            println!("      blocking: true");
        }
        if let Some(cwd) = task.effective_cwd(&cfg.default) {
            println!("      cwd: {cwd}");
        }
    }

    match graph.topological_order() {
        Ok(order) => {
            let names: Vec<_> = order.iter().map(|&id| graph.node(id).name()).collect();
            println!();
            println!("order: {}", names.join(" -> "));
        }
        Err(stall) => println!("order: none ({stall})"),
    }

    debug!("dry-run complete (no execution)");
}
