// src/engine/mod.rs

//! Execution engine.
//!
//! Three ways to run a [`Graph`]:
//! - [`run_sequential`]: topological walk, no overlap.
//! - [`run_concurrent`]: every ready node becomes a task; the loop advances
//!   whenever any task finishes.
//! - [`run_concurrent_mixed`]: as above, but sync nodes run inline as soon
//!   as they are ready.
//!
//! Supporting pieces: [`task_set`] (the in-flight set), [`failure`]
//! (batch aggregation) and [`cancel`] (cooperative teardown).

pub mod cancel;
pub mod concurrent;
pub mod failure;
pub mod sequential;
pub mod task_set;

use tracing::debug;

use crate::dag::Graph;
use crate::errors::RunError;

pub use crate::types::{FailurePolicy, RunMode};
pub use cancel::cancel_all;
pub use concurrent::ConcurrentRunner;
pub use failure::aggregate_failures;
pub use sequential::run_sequential;
pub use task_set::{TaskOutcome, TaskSet};

/// Options shared by the concurrent runners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerOptions {
    /// What to do with still-running siblings once a batch fails.
    pub on_failure: FailurePolicy,
}

/// Run `graph` concurrently with default options.
///
/// On failure, tasks that were still running are detached and keep going
/// in the background; use [`ConcurrentRunner`] directly to cancel them.
pub async fn run_concurrent(graph: &Graph) -> Result<(), RunError> {
    run_detached(ConcurrentRunner::new(RunnerOptions::default()), graph).await
}

/// Like [`run_concurrent`], with sync nodes executed inline.
pub async fn run_concurrent_mixed(graph: &Graph) -> Result<(), RunError> {
    run_detached(ConcurrentRunner::mixed(RunnerOptions::default()), graph).await
}

/// Run `graph` with the runner selected by `mode`.
pub async fn run_graph(graph: &Graph, mode: RunMode, options: RunnerOptions) -> Result<(), RunError> {
    match mode {
        RunMode::Sequential => run_sequential(graph).await,
        RunMode::Concurrent => run_detached(ConcurrentRunner::new(options), graph).await,
        RunMode::ConcurrentMixed => run_detached(ConcurrentRunner::mixed(options), graph).await,
    }
}

async fn run_detached(mut runner: ConcurrentRunner, graph: &Graph) -> Result<(), RunError> {
    let result = runner.run(graph).await;
    if let Some(outstanding) = runner.take_outstanding() {
        debug!(
            graph = %graph.name(),
            nodes = ?outstanding.node_names(),
            "detaching tasks still running after failure"
        );
        outstanding.detach();
    }
    result
}
