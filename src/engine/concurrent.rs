// src/engine/concurrent.rs

//! Concurrent runners.
//!
//! Both variants share one loop: dispatch everything that is ready, wait
//! for the next completion batch, fold the batch into the tracker, repeat.
//! They differ only in how sync nodes are dispatched:
//! - [`ConcurrentRunner::new`] calls a sync node at dispatch and queues
//!   its result in the [`TaskSet`], so every node goes through the same
//!   completion path and results known at one dispatch share a batch.
//! - [`ConcurrentRunner::mixed`] runs sync nodes inline the moment they
//!   become ready and feeds their completion straight back into the
//!   tracker, draining until no sync node is ready. Only async nodes ever
//!   become tasks.
//!
//! The tracker lives on the loop that calls [`ConcurrentRunner::run`]; task
//! bodies only ever report back through the [`TaskSet`].

use tracing::{debug, info, trace, warn};

use crate::dag::{Graph, NodeId, NodeKind, ReadinessTracker};
use crate::engine::RunnerOptions;
use crate::engine::cancel::cancel_all;
use crate::engine::failure::{aggregate_failures, merge_failures, split_batch};
use crate::engine::task_set::TaskSet;
use crate::errors::{NodeFailure, RunError, StallError};
use crate::types::FailurePolicy;

#[derive(Debug)]
pub struct ConcurrentRunner {
    options: RunnerOptions,
    inline_sync: bool,
    /// Tasks still running when the last run failed, if they were left alone.
    outstanding: Option<TaskSet>,
}

impl ConcurrentRunner {
    pub fn new(options: RunnerOptions) -> Self {
        Self {
            options,
            inline_sync: false,
            outstanding: None,
        }
    }

    /// Variant that executes sync nodes inline instead of as tasks.
    pub fn mixed(options: RunnerOptions) -> Self {
        Self {
            options,
            inline_sync: true,
            outstanding: None,
        }
    }

    /// Tasks left running by the last failed run under
    /// [`FailurePolicy::LeaveRunning`].
    ///
    /// Hand them to [`cancel_all`] for fail-fast cleanup, or
    /// [`TaskSet::detach`] them to let them finish. If they are never taken,
    /// dropping the runner aborts them.
    pub fn take_outstanding(&mut self) -> Option<TaskSet> {
        self.outstanding.take()
    }

    /// Execute every node of `graph`, overlapping independent async nodes.
    ///
    /// Returns at the first completion batch containing a failure. A graph
    /// that cannot finish (a cycle) is reported as a [`StallError`].
    pub async fn run(&mut self, graph: &Graph) -> Result<(), RunError> {
        self.outstanding = None;

        let mut tracker = ReadinessTracker::new(graph);
        let mut running = TaskSet::new();

        info!(
            graph = %graph.name(),
            nodes = graph.len(),
            inline_sync = self.inline_sync,
            "starting concurrent run"
        );

        let seeds = tracker.ready_set();
        if let Err(err) = self.dispatch(graph, &mut tracker, &mut running, seeds) {
            return self.abort_run(graph, running, err).await;
        }

        while !running.is_empty() {
            let batch = running.next_batch().await;
            let (succeeded, failures) = split_batch(batch);

            debug!(
                graph = %graph.name(),
                succeeded = succeeded.len(),
                failed = failures.len(),
                running = running.len(),
                "completion batch"
            );

            if let Some(err) = aggregate_failures(failures) {
                return self.abort_run(graph, running, err).await;
            }

            for node in succeeded {
                let newly_ready = tracker.completed(node);
                if let Err(err) = self.dispatch(graph, &mut tracker, &mut running, newly_ready) {
                    return self.abort_run(graph, running, err).await;
                }
            }
        }

        if !tracker.empty() {
            let stall = StallError {
                graph: graph.name().to_string(),
                pending: tracker.pending(),
                total: graph.len(),
            };
            warn!(graph = %graph.name(), pending = ?stall.pending, "run stalled with nothing left to wait on");
            return Err(stall.into());
        }

        info!(graph = %graph.name(), "concurrent run complete");
        Ok(())
    }

    /// Start every node in `ready`. In mixed mode ready sync nodes run here
    /// and now, before anything new is added to `running`.
    fn dispatch(
        &self,
        graph: &Graph,
        tracker: &mut ReadinessTracker<'_>,
        running: &mut TaskSet,
        ready: Vec<NodeId>,
    ) -> Result<(), RunError> {
        let (mut inline, mut deferred): (Vec<NodeId>, Vec<NodeId>) = ready
            .into_iter()
            .partition(|&id| self.runs_inline(graph, id));

        while let Some(id) = inline.pop() {
            let node = graph.node(id);
            if let NodeKind::Sync(body) = node.kind() {
                trace!(node = %node.name(), "running sync node inline");
                body().map_err(|err| NodeFailure::new(node.name(), err))?;
            }

            for next in tracker.completed(id) {
                if self.runs_inline(graph, next) {
                    inline.push(next);
                } else {
                    deferred.push(next);
                }
            }
        }

        for id in deferred {
            let node = graph.node(id);
            debug!(node = %node.name(), kind = ?node.kind(), "dispatching node");
            match node.kind() {
                NodeKind::Async(body) => running.spawn(id, node.name(), body()),
                NodeKind::Sync(body) => running.push_finished(id, node.name(), body()),
            }
        }

        Ok(())
    }

    fn runs_inline(&self, graph: &Graph, id: NodeId) -> bool {
        self.inline_sync && graph.node(id).kind().is_sync()
    }

    async fn abort_run(&mut self, graph: &Graph, running: TaskSet, err: RunError) -> Result<(), RunError> {
        let failed: Vec<&str> = err.failures().iter().map(|f| f.node()).collect();
        warn!(
            graph = %graph.name(),
            ?failed,
            outstanding = running.len(),
            policy = ?self.options.on_failure,
            "run failed"
        );

        if running.is_empty() {
            return Err(err);
        }

        match self.options.on_failure {
            FailurePolicy::LeaveRunning => {
                self.outstanding = Some(running);
                Err(err)
            }
            FailurePolicy::CancelOutstanding => match cancel_all(running).await {
                Ok(()) => Err(err),
                Err(teardown) => Err(merge_failures(err, teardown.into_failures())),
            },
        }
    }
}
