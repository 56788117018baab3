// src/dag/graph.rs

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::{debug, warn};

use crate::config::ConfigFile;
use crate::dag::tracker::ReadinessTracker;
use crate::errors::{GraphError, StallError};
use crate::exec::node_kind_for_task;

/// Canonical node name type.
pub type NodeName = String;

/// Stable handle of a node inside one [`Graph`].
pub type NodeId = NodeIndex;

/// What a node body reports. The `Ok` value carries nothing; results are
/// the node's own business.
pub type NodeResult = anyhow::Result<()>;

pub type NodeFuture = Pin<Box<dyn Future<Output = NodeResult> + Send + 'static>>;
pub type SyncFn = Arc<dyn Fn() -> NodeResult + Send + Sync>;
pub type AsyncFn = Arc<dyn Fn() -> NodeFuture + Send + Sync>;

/// The two kinds of work a node can carry. Fixed when the graph is built;
/// runners dispatch on the tag and never look inside the callable.
#[derive(Clone)]
pub enum NodeKind {
    /// Runs to completion on the runner's thread without suspending.
    Sync(SyncFn),
    /// Produces a future that may suspend at points of its own choosing.
    Async(AsyncFn),
}

impl NodeKind {
    pub fn blocking<F>(f: F) -> Self
    where
        F: Fn() -> NodeResult + Send + Sync + 'static,
    {
        NodeKind::Sync(Arc::new(f))
    }

    pub fn suspending<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = NodeResult> + Send + 'static,
    {
        NodeKind::Async(Arc::new(move || Box::pin(f()) as NodeFuture))
    }

    pub fn is_sync(&self) -> bool {
        matches!(self, NodeKind::Sync(_))
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Sync(_) => f.write_str("Sync"),
            NodeKind::Async(_) => f.write_str("Async"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    name: NodeName,
    kind: NodeKind,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }
}

/// Immutable dependency graph.
///
/// An edge `a -> b` means `a` must complete before `b` may start. The graph
/// is never mutated by a run, so one graph can back any number of runs,
/// sequentially or at the same time.
///
/// Cycles are not rejected here: a cyclic graph builds fine and every runner
/// reports it as a [`StallError`].
#[derive(Debug, Clone)]
pub struct Graph {
    name: String,
    graph: DiGraph<Node, ()>,
    index: HashMap<NodeName, NodeId>,
    /// Topological order, or the names of the nodes that can never become
    /// ready if the graph has a cycle.
    order: Result<Vec<NodeId>, Vec<NodeName>>,
}

impl Graph {
    /// Build a graph of shell-command nodes from a validated [`ConfigFile`].
    pub fn from_config(name: &str, cfg: &ConfigFile) -> Result<Self, GraphError> {
        let mut builder = GraphBuilder::new(name);

        for (task_name, task) in cfg.task.iter() {
            builder = builder.node(
                task_name.as_str(),
                node_kind_for_task(task_name, task, &cfg.default),
            );
        }

        for (task_name, task) in cfg.task.iter() {
            for dep in task.after.iter() {
                builder = builder.edge(dep.as_str(), task_name.as_str());
            }
        }

        builder.build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.graph[id]
    }

    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.graph.node_indices().map(move |id| (id, &self.graph[id]))
    }

    /// All edges as `(predecessor, successor)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.graph.edge_references().map(|e| (e.source(), e.target()))
    }

    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.neighbors_directed(id, Direction::Outgoing)
    }

    pub fn predecessors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.neighbors_directed(id, Direction::Incoming)
    }

    pub fn in_degree(&self, id: NodeId) -> usize {
        self.predecessors(id).count()
    }

    /// A total order consistent with every edge.
    ///
    /// Computed once at build time, so repeated calls (and repeated runs)
    /// always see the same order.
    pub fn topological_order(&self) -> Result<&[NodeId], StallError> {
        match &self.order {
            Ok(order) => Ok(order),
            Err(pending) => Err(StallError {
                graph: self.name.clone(),
                pending: pending.clone(),
                total: self.len(),
            }),
        }
    }

    /// Names of the nodes that can never become ready. Only non-empty for
    /// cyclic graphs (the cycle members plus everything behind them).
    fn stalled_nodes(&self) -> Vec<NodeName> {
        let mut tracker = ReadinessTracker::new(self);
        let mut ready = tracker.ready_set();
        while let Some(id) = ready.pop() {
            ready.extend(tracker.completed(id));
        }
        tracker.pending()
    }
}

/// Incremental construction of a [`Graph`].
///
/// Validation is deferred to [`GraphBuilder::build`], which reports the
/// first duplicate node or dangling edge it finds.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    name: String,
    nodes: Vec<Node>,
    edges: Vec<(NodeName, NodeName)>,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn node(mut self, name: impl Into<NodeName>, kind: NodeKind) -> Self {
        self.nodes.push(Node {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn sync_node<F>(self, name: impl Into<NodeName>, f: F) -> Self
    where
        F: Fn() -> NodeResult + Send + Sync + 'static,
    {
        self.node(name, NodeKind::blocking(f))
    }

    pub fn async_node<F, Fut>(self, name: impl Into<NodeName>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = NodeResult> + Send + 'static,
    {
        self.node(name, NodeKind::suspending(f))
    }

    /// `from` must complete before `to` starts.
    pub fn edge(mut self, from: impl Into<NodeName>, to: impl Into<NodeName>) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    pub fn build(self) -> Result<Graph, GraphError> {
        let mut graph: DiGraph<Node, ()> = DiGraph::with_capacity(self.nodes.len(), self.edges.len());
        let mut index: HashMap<NodeName, NodeId> = HashMap::with_capacity(self.nodes.len());

        for node in self.nodes {
            if index.contains_key(&node.name) {
                return Err(GraphError::DuplicateNode(node.name));
            }
            let name = node.name.clone();
            let id = graph.add_node(node);
            index.insert(name, id);
        }

        for (from, to) in self.edges {
            let lookup = |name: &NodeName| {
                index.get(name).copied().ok_or_else(|| GraphError::UnknownNode {
                    from: from.clone(),
                    to: to.clone(),
                    missing: name.clone(),
                })
            };
            let (a, b) = (lookup(&from)?, lookup(&to)?);
            // Repeated edges collapse so in-degrees stay exact.
            graph.update_edge(a, b, ());
        }

        let mut built = Graph {
            name: self.name,
            graph,
            index,
            order: Ok(Vec::new()),
        };

        built.order = match toposort(&built.graph, None) {
            Ok(order) => Ok(order),
            Err(cycle) => {
                let node = built.graph[cycle.node_id()].name.clone();
                let stalled = built.stalled_nodes();
                warn!(
                    graph = %built.name,
                    node = %node,
                    stalled = stalled.len(),
                    "graph contains a cycle; every run of it will stall"
                );
                Err(stalled)
            }
        };

        debug!(
            graph = %built.name,
            nodes = built.len(),
            edges = built.graph.edge_count(),
            "graph built"
        );

        Ok(built)
    }
}
