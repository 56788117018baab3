// src/errors.rs

//! Crate-wide error types.
//!
//! Run-time failures are split the same way callers need to report them:
//! - [`NodeFailure`]: one node body returned an error (or panicked).
//! - [`AggregateFailure`]: several node failures surfaced together.
//! - [`StallError`]: the graph can make no further progress.
//!
//! [`DagrunError`] is the crate-level error used by config loading and the
//! binary; node bodies themselves report `anyhow::Error`.

use std::fmt;

use thiserror::Error;

use crate::dag::NodeName;

/// An error raised from inside a node body, tagged with the node's name.
#[derive(Error, Debug)]
#[error("node '{node}' failed: {source}")]
pub struct NodeFailure {
    node: NodeName,
    #[source]
    source: anyhow::Error,
}

impl NodeFailure {
    pub fn new(node: impl Into<NodeName>, source: anyhow::Error) -> Self {
        Self {
            node: node.into(),
            source,
        }
    }

    /// Name of the node whose body failed.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// The original error returned by the node body.
    pub fn cause(&self) -> &anyhow::Error {
        &self.source
    }
}

/// Two or more node failures observed in the same completion batch, or
/// collected while cancelling outstanding tasks.
///
/// `source()` points at the first failure; [`AggregateFailure::causes`]
/// keeps the full list in the order the failures were observed.
#[derive(Debug)]
pub struct AggregateFailure {
    causes: Vec<NodeFailure>,
}

impl AggregateFailure {
    pub(crate) fn new(causes: Vec<NodeFailure>) -> Self {
        debug_assert!(causes.len() >= 2, "aggregate of fewer than two failures");
        Self { causes }
    }

    pub fn causes(&self) -> &[NodeFailure] {
        &self.causes
    }

    pub fn into_causes(self) -> Vec<NodeFailure> {
        self.causes
    }

    /// Never less than two.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.causes.len()
    }
}

impl fmt::Display for AggregateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} nodes failed:", self.causes.len())?;
        for cause in &self.causes {
            write!(f, " [{}: {}]", cause.node, cause.source)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.causes
            .first()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

/// The tracker still holds nodes, nothing is running and nothing is ready.
///
/// Always indicates a cyclic or malformed graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "graph '{graph}' stalled: {} of {total} nodes can never become ready ({})",
    .pending.len(),
    .pending.join(", ")
)]
pub struct StallError {
    pub graph: String,
    pub pending: Vec<NodeName>,
    pub total: usize,
}

/// Outcome of a failed run.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Node(#[from] NodeFailure),

    #[error(transparent)]
    Aggregate(#[from] AggregateFailure),

    #[error(transparent)]
    Stall(#[from] StallError),
}

impl RunError {
    /// Every node failure carried by this error, in observation order.
    pub fn failures(&self) -> Vec<&NodeFailure> {
        match self {
            RunError::Node(f) => vec![f],
            RunError::Aggregate(agg) => agg.causes().iter().collect(),
            RunError::Stall(_) => Vec::new(),
        }
    }

    pub(crate) fn into_failures(self) -> Vec<NodeFailure> {
        match self {
            RunError::Node(f) => vec![f],
            RunError::Aggregate(agg) => agg.into_causes(),
            RunError::Stall(_) => Vec::new(),
        }
    }
}

/// Problems detected while building a [`crate::dag::Graph`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate node '{0}'")]
    DuplicateNode(NodeName),

    #[error("edge {from} -> {to} references unknown node '{missing}'")]
    UnknownNode {
        from: NodeName,
        to: NodeName,
        missing: NodeName,
    },
}

#[derive(Error, Debug)]
pub enum DagrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DagrunError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn aggregate_source_is_first_cause() {
        let agg = AggregateFailure::new(vec![
            NodeFailure::new("a", anyhow::anyhow!("boom a")),
            NodeFailure::new("b", anyhow::anyhow!("boom b")),
        ]);

        let source = agg.source().expect("aggregate has a source");
        assert_eq!(source.to_string(), "node 'a' failed: boom a");
        assert_eq!(agg.len(), 2);
        assert_eq!(agg.to_string(), "2 nodes failed: [a: boom a] [b: boom b]");
    }

    #[test]
    fn run_error_lists_every_failure() {
        let err = RunError::from(AggregateFailure::new(vec![
            NodeFailure::new("x", anyhow::anyhow!("1")),
            NodeFailure::new("y", anyhow::anyhow!("2")),
        ]));
        let names: Vec<_> = err.failures().iter().map(|f| f.node()).collect();
        assert_eq!(names, ["x", "y"]);

        let stall = RunError::from(StallError {
            graph: "g".into(),
            pending: vec!["a".into(), "b".into()],
            total: 2,
        });
        assert!(stall.failures().is_empty());
        assert_eq!(
            stall.to_string(),
            "graph 'g' stalled: 2 of 2 nodes can never become ready (a, b)"
        );
    }
}
