// src/engine/cancel.rs

//! Cooperative cancellation of outstanding tasks.

use tracing::{debug, trace};

use crate::engine::failure::aggregate_failures;
use crate::engine::task_set::TaskSet;
use crate::errors::{NodeFailure, RunError};

/// Cancel every task in `tasks` and wait until each has actually stopped.
///
/// Tasks that had already failed before cancellation was requested keep
/// their failure: it is reported, not swallowed. A task stopping because of
/// the cancellation is the expected outcome and is not an error. Async
/// nodes stop at their next suspension point; nothing is preempted.
pub async fn cancel_all(mut tasks: TaskSet) -> Result<(), RunError> {
    let mut failures: Vec<NodeFailure> = Vec::new();

    // Anything already finished was finished before we asked.
    while let Some(joined) = tasks.try_join_next() {
        if let Err(failure) = joined.into_outcome().result {
            debug!(node = %failure.node(), "task had already failed before cancellation");
            failures.push(failure);
        }
    }

    debug!(outstanding = tasks.len(), "cancelling outstanding tasks");
    tasks.abort_all();

    while let Some(joined) = tasks.join_next().await {
        match joined.result {
            Err(err) if err.is_cancelled() => {
                trace!(node = %joined.name, "task cancelled");
            }
            Ok(Ok(())) => {
                trace!(node = %joined.name, "task finished before the cancellation landed");
            }
            Ok(Err(err)) => failures.push(NodeFailure::new(joined.name, err)),
            Err(err) => failures.push(NodeFailure::new(joined.name, anyhow::anyhow!("{err}"))),
        }
    }

    match aggregate_failures(failures) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
