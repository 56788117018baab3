// src/dag/mod.rs

//! Graph representation and per-run readiness tracking.
//!
//! - [`graph`] holds the immutable node/edge container and its builder.
//! - [`tracker`] holds the per-run state that decides which nodes may run.

pub mod graph;
pub mod tracker;

pub use graph::{
    AsyncFn, Graph, GraphBuilder, Node, NodeFuture, NodeId, NodeKind, NodeName, NodeResult,
    SyncFn,
};
pub use tracker::ReadinessTracker;
