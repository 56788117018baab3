// src/exec/command.rs

//! Shell commands as graph nodes.
//!
//! Non-blocking tasks become async nodes backed by `tokio::process`. The
//! child is spawned with `kill_on_drop(true)`, so cancelling the node (or
//! aborting its task) also kills the process. Blocking tasks become sync
//! nodes backed by `std::process` and hold the runner until they exit.

use std::path::PathBuf;
use std::process::ExitStatus;

use anyhow::{Context, bail};
use tracing::{debug, info};

use crate::config::{ConfigFile, DefaultSection, TaskConfig};
use crate::dag::{Graph, GraphBuilder, NodeKind, NodeResult};
use crate::errors::GraphError;

/// Everything needed to launch one task's command.
#[derive(Debug, Clone)]
struct CommandSpec {
    node: String,
    cmd: String,
    cwd: Option<PathBuf>,
}

/// One node per `[task.<name>]` entry, one edge per `after` entry.
pub fn graph_from_config(name: &str, cfg: &ConfigFile) -> Result<Graph, GraphError> {
    let mut builder = GraphBuilder::new(name);

    for (task_name, task) in cfg.task.iter() {
        builder = builder.node(task_name.as_str(), node_kind_for_task(task_name, task, &cfg.default));
    }

    for (task_name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            builder = builder.edge(dep.as_str(), task_name.as_str());
        }
    }

    builder.build()
}

/// Build the node body for a `[task.<name>]` entry.
pub fn node_kind_for_task(name: &str, task: &TaskConfig, defaults: &DefaultSection) -> NodeKind {
    let spec = CommandSpec {
        node: name.to_string(),
        cmd: task.cmd.clone(),
        cwd: task.effective_cwd(defaults).map(PathBuf::from),
    };

    if task.effective_blocking(defaults) {
        NodeKind::blocking(move || run_blocking(&spec))
    } else {
        NodeKind::suspending(move || {
            let spec = spec.clone();
            async move { run_suspending(&spec).await }
        })
    }
}

fn run_blocking(spec: &CommandSpec) -> NodeResult {
    info!(node = %spec.node, cmd = %spec.cmd, "starting blocking command");

    let (shell, flag) = shell();
    let mut cmd = std::process::Command::new(shell);
    cmd.arg(flag).arg(&spec.cmd);
    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }

    let status = cmd
        .status()
        .with_context(|| format!("spawning process for node '{}'", spec.node))?;

    check_status(spec, status)
}

async fn run_suspending(spec: &CommandSpec) -> NodeResult {
    info!(node = %spec.node, cmd = %spec.cmd, "starting command");

    let (shell, flag) = shell();
    let mut cmd = tokio::process::Command::new(shell);
    cmd.arg(flag).arg(&spec.cmd).kill_on_drop(true);
    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for node '{}'", spec.node))?;

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of node '{}'", spec.node))?;

    check_status(spec, status)
}

fn check_status(spec: &CommandSpec, status: ExitStatus) -> NodeResult {
    if status.success() {
        debug!(node = %spec.node, "command exited successfully");
        return Ok(());
    }

    match status.code() {
        Some(code) => bail!("command `{}` exited with status {}", spec.cmd, code),
        None => bail!("command `{}` was terminated by a signal", spec.cmd),
    }
}

/// Platform shell and its "run this string" flag.
fn shell() -> (&'static str, &'static str) {
    if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") }
}
