// src/engine/failure.rs

//! Turning a batch of task outcomes into zero, one or many errors.

use crate::dag::NodeId;
use crate::engine::task_set::TaskOutcome;
use crate::errors::{AggregateFailure, NodeFailure, RunError};

/// Split a finished batch into the nodes that succeeded and the failures,
/// both in batch order.
pub fn split_batch(batch: Vec<TaskOutcome>) -> (Vec<NodeId>, Vec<NodeFailure>) {
    let mut succeeded = Vec::with_capacity(batch.len());
    let mut failures = Vec::new();

    for outcome in batch {
        match outcome.result {
            Ok(()) => succeeded.push(outcome.node),
            Err(failure) => failures.push(failure),
        }
    }

    (succeeded, failures)
}

/// `None` when nothing failed, the original failure when exactly one did,
/// otherwise an [`AggregateFailure`] headed by the first failure.
pub fn aggregate_failures(failures: Vec<NodeFailure>) -> Option<RunError> {
    let mut failures = failures;
    match failures.len() {
        0 => None,
        1 => failures.pop().map(RunError::Node),
        _ => Some(RunError::Aggregate(AggregateFailure::new(failures))),
    }
}

/// Fold failures seen while tearing a run down into the error that
/// triggered the teardown. The triggering failures stay first.
pub(crate) fn merge_failures(primary: RunError, extra: Vec<NodeFailure>) -> RunError {
    if extra.is_empty() || matches!(primary, RunError::Stall(_)) {
        return primary;
    }

    let mut all = primary.into_failures();
    all.extend(extra);
    RunError::Aggregate(AggregateFailure::new(all))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn failure(node: &str) -> NodeFailure {
        NodeFailure::new(node, anyhow::anyhow!("{node} broke"))
    }

    #[test]
    fn no_failures_is_none() {
        assert!(aggregate_failures(Vec::new()).is_none());
    }

    #[test]
    fn single_failure_is_passed_through() {
        match aggregate_failures(vec![failure("a")]) {
            Some(RunError::Node(f)) => {
                assert_eq!(f.node(), "a");
                assert_eq!(f.cause().to_string(), "a broke");
            }
            other => panic!("expected a single node failure, got {other:?}"),
        }
    }

    #[test]
    fn several_failures_aggregate_in_order() {
        let err = aggregate_failures(vec![failure("a"), failure("b"), failure("c")]).unwrap();
        let RunError::Aggregate(agg) = &err else {
            panic!("expected aggregate, got {err:?}");
        };

        let names: Vec<_> = agg.causes().iter().map(|c| c.node()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(
            agg.source().map(|s| s.to_string()),
            Some("node 'a' failed: a broke".to_string())
        );
    }

    #[test]
    fn split_keeps_successes_and_failures_apart() {
        let ok = NodeId::new(0);
        let bad = NodeId::new(1);
        let (succeeded, failures) = split_batch(vec![
            TaskOutcome { node: ok, result: Ok(()) },
            TaskOutcome { node: bad, result: Err(failure("bad")) },
        ]);

        assert_eq!(succeeded, [ok]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].node(), "bad");
    }

    #[test]
    fn merge_appends_teardown_failures() {
        let merged = merge_failures(RunError::Node(failure("first")), vec![failure("late")]);
        let names: Vec<_> = merged.failures().iter().map(|f| f.node()).collect();
        assert_eq!(names, ["first", "late"]);

        let untouched = merge_failures(RunError::Node(failure("only")), Vec::new());
        assert!(matches!(untouched, RunError::Node(_)));
    }
}
