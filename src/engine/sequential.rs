// src/engine/sequential.rs

//! One node at a time, in topological order.

use tracing::{debug, info, warn};

use crate::dag::{Graph, NodeFuture, NodeId, NodeKind};
use crate::engine::task_set::TaskSet;
use crate::errors::{NodeFailure, RunError};

/// Walk `graph.topological_order()`, calling sync nodes and awaiting async
/// nodes one at a time. Nothing overlaps; the first failing node ends the
/// walk and its failure is returned as-is.
pub async fn run_sequential(graph: &Graph) -> Result<(), RunError> {
    let order = graph.topological_order().inspect_err(|stall| {
        warn!(graph = %graph.name(), pending = ?stall.pending, "graph has no topological order");
    })?;

    info!(graph = %graph.name(), nodes = order.len(), "starting sequential run");

    for &id in order {
        let node = graph.node(id);
        debug!(node = %node.name(), kind = ?node.kind(), "running node");

        let result = match node.kind() {
            NodeKind::Sync(body) => body().map_err(|err| NodeFailure::new(node.name(), err)),
            NodeKind::Async(body) => run_alone(id, node.name(), body()).await,
        };

        if let Err(failure) = result {
            warn!(graph = %graph.name(), node = %node.name(), error = %failure.cause(), "node failed; stopping run");
            return Err(failure.into());
        }
    }

    info!(graph = %graph.name(), "sequential run complete");
    Ok(())
}

/// Await one async body as its own task, so a panic is reported as the
/// node's failure just like under the concurrent runners. Dropping the
/// returned future aborts the task.
async fn run_alone(id: NodeId, name: &str, future: NodeFuture) -> Result<(), NodeFailure> {
    let mut single = TaskSet::new();
    single.spawn(id, name, future);
    match single.join_next().await {
        Some(joined) => joined.into_outcome().result,
        None => Ok(()),
    }
}
