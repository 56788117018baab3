// src/engine/task_set.rs

//! The set of in-flight tasks owned by a concurrent run.

use std::collections::HashMap;

use tokio::task::{self, JoinError, JoinSet};
use tracing::{trace, warn};

use crate::dag::{NodeFuture, NodeId, NodeName, NodeResult};
use crate::errors::NodeFailure;

/// How one task ended.
#[derive(Debug)]
pub struct TaskOutcome {
    pub node: NodeId,
    pub result: Result<(), NodeFailure>,
}

#[derive(Debug)]
struct TaskEntry {
    node: NodeId,
    name: NodeName,
}

/// A task as it came out of the join set (or the ready queue), before any
/// interpretation.
#[derive(Debug)]
pub(crate) struct Joined {
    pub node: NodeId,
    pub name: NodeName,
    pub result: Result<NodeResult, JoinError>,
}

impl Joined {
    /// Panics and unexpected cancellations count as failures of the node.
    pub(crate) fn into_outcome(self) -> TaskOutcome {
        let result = match self.result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(NodeFailure::new(self.name, err)),
            Err(join_err) => Err(NodeFailure::new(self.name, anyhow::anyhow!("{join_err}"))),
        };
        TaskOutcome {
            node: self.node,
            result,
        }
    }
}

/// Tasks dispatched by a runner and not yet reaped.
///
/// Built on [`JoinSet`], so completions are delivered to whichever loop owns
/// the set; the futures themselves may run on any runtime worker. Results
/// known at dispatch (sync nodes) skip the join set and wait in a ready
/// queue, so they are never split across batches by worker scheduling.
///
/// Dropping a `TaskSet` aborts everything still in it; call
/// [`TaskSet::detach`] to let the tasks run to completion unobserved instead.
#[derive(Debug, Default)]
pub struct TaskSet {
    tasks: JoinSet<NodeResult>,
    entries: HashMap<task::Id, TaskEntry>,
    ready: Vec<Joined>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `future` as a task on the current Tokio runtime.
    pub fn spawn(&mut self, node: NodeId, name: impl Into<NodeName>, future: NodeFuture) {
        let name = name.into();
        let handle = self.tasks.spawn(future);
        trace!(node = %name, task_id = %handle.id(), "task spawned");
        self.entries.insert(handle.id(), TaskEntry { node, name });
    }

    /// Register a result that is already known. It is handed out by the
    /// next [`Self::next_batch`] without going through the runtime.
    pub(crate) fn push_finished(&mut self, node: NodeId, name: impl Into<NodeName>, result: NodeResult) {
        let name = name.into();
        trace!(node = %name, "finished result queued");
        self.ready.push(Joined {
            node,
            name,
            result: Ok(result),
        });
    }

    pub fn len(&self) -> usize {
        self.tasks.len() + self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.ready.is_empty()
    }

    /// Names of the nodes still in the set, finished-but-unreaped included.
    pub fn node_names(&self) -> Vec<&str> {
        self.ready
            .iter()
            .map(|j| j.name.as_str())
            .chain(self.entries.values().map(|e| e.name.as_str()))
            .collect()
    }

    /// Collect every queued result plus every task that has already
    /// finished. Only waits when nothing is finished yet, and then only for
    /// the first completion.
    ///
    /// Returns an empty batch only when the set is empty. Every result
    /// queued since the last batch is in this one; beyond that, completion
    /// order decides which tasks land in a batch.
    pub async fn next_batch(&mut self) -> Vec<TaskOutcome> {
        let mut batch: Vec<TaskOutcome> = self.ready.drain(..).map(Joined::into_outcome).collect();

        if batch.is_empty() {
            if let Some(first) = self.join_next().await {
                batch.push(first.into_outcome());
            }
        }
        while let Some(joined) = self.try_join_next() {
            batch.push(joined.into_outcome());
        }

        batch
    }

    pub(crate) async fn join_next(&mut self) -> Option<Joined> {
        if let Some(joined) = self.ready.pop() {
            return Some(joined);
        }
        loop {
            let joined = self.tasks.join_next_with_id().await?;
            if let Some(joined) = self.resolve(joined) {
                return Some(joined);
            }
        }
    }

    pub(crate) fn try_join_next(&mut self) -> Option<Joined> {
        if let Some(joined) = self.ready.pop() {
            return Some(joined);
        }
        loop {
            let joined = self.tasks.try_join_next_with_id()?;
            if let Some(joined) = self.resolve(joined) {
                return Some(joined);
            }
        }
    }

    pub(crate) fn abort_all(&mut self) {
        self.tasks.abort_all();
    }

    /// Let every remaining task run to completion in the background. Their
    /// results are discarded.
    pub fn detach(mut self) {
        self.ready.clear();
        self.entries.clear();
        self.tasks.detach_all();
    }

    fn resolve(&mut self, joined: Result<(task::Id, NodeResult), JoinError>) -> Option<Joined> {
        let (id, result) = match joined {
            Ok((id, result)) => (id, Ok(result)),
            Err(err) => (err.id(), Err(err)),
        };

        match self.entries.remove(&id) {
            Some(TaskEntry { node, name }) => Some(Joined { node, name, result }),
            None => {
                warn!(task_id = %id, "joined a task with no registered node; ignoring");
                None
            }
        }
    }
}
