// src/dag/tracker.rs

//! Per-run readiness bookkeeping.

use crate::dag::graph::{Graph, NodeId, NodeName};

/// Lifecycle of one node inside a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    /// Still waiting on at least one predecessor.
    Blocked,
    /// Every predecessor completed, but the node has not been handed out yet.
    Ready,
    /// Handed to the runner (via `ready_set` or `completed`).
    Surfaced,
    /// Reported back through `completed`.
    Done,
}

/// Tracks how many unresolved dependencies each node still has.
///
/// Remaining counts are seeded once from the in-degrees and only ever go
/// down, so a whole run costs O(V + E). A tracker belongs to exactly one run
/// and is only touched by the loop driving that run.
#[derive(Debug)]
pub struct ReadinessTracker<'g> {
    graph: &'g Graph,
    remaining: Vec<usize>,
    state: Vec<Readiness>,
    /// Nodes in `Ready` that `ready_set` has not returned yet.
    unsurfaced: Vec<NodeId>,
    done: usize,
}

impl<'g> ReadinessTracker<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        let mut remaining = vec![0; graph.len()];
        let mut state = vec![Readiness::Blocked; graph.len()];
        let mut unsurfaced = Vec::new();

        for (id, _) in graph.nodes() {
            let deps = graph.in_degree(id);
            remaining[id.index()] = deps;
            if deps == 0 {
                state[id.index()] = Readiness::Ready;
                unsurfaced.push(id);
            }
        }

        Self {
            graph,
            remaining,
            state,
            unsurfaced,
            done: 0,
        }
    }

    /// Every ready node not handed out before. Each node is returned at most
    /// once over the tracker's lifetime.
    pub fn ready_set(&mut self) -> Vec<NodeId> {
        let ready = std::mem::take(&mut self.unsurfaced);
        for id in &ready {
            self.state[id.index()] = Readiness::Surfaced;
        }
        ready
    }

    /// Mark `node` as finished and return the successors that just became
    /// ready. Those successors count as surfaced: `ready_set` will not
    /// return them again.
    ///
    /// # Panics
    ///
    /// If `node` was never surfaced, or was already completed.
    pub fn completed(&mut self, node: NodeId) -> Vec<NodeId> {
        let slot = node.index();
        assert!(
            self.state[slot] == Readiness::Surfaced,
            "completed() called for node '{}' in state {:?}",
            self.graph.node(node).name(),
            self.state[slot]
        );
        self.state[slot] = Readiness::Done;
        self.done += 1;

        let graph = self.graph;
        let mut newly_ready = Vec::new();
        for succ in graph.successors(node) {
            let count = &mut self.remaining[succ.index()];
            *count -= 1;
            if *count == 0 {
                self.state[succ.index()] = Readiness::Surfaced;
                newly_ready.push(succ);
            }
        }
        newly_ready
    }

    /// True once every node has been passed to [`Self::completed`].
    pub fn empty(&self) -> bool {
        self.done == self.state.len()
    }

    /// Names of nodes not yet completed.
    pub fn pending(&self) -> Vec<NodeName> {
        self.graph
            .nodes()
            .filter(|(id, _)| self.state[id.index()] != Readiness::Done)
            .map(|(_, node)| node.name().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::graph::{GraphBuilder, NodeResult};

    fn noop() -> NodeResult {
        Ok(())
    }

    fn diamond() -> Graph {
        GraphBuilder::new("diamond")
            .sync_node("a", noop)
            .sync_node("b", noop)
            .sync_node("c", noop)
            .sync_node("d", noop)
            .edge("a", "b")
            .edge("a", "c")
            .edge("b", "d")
            .edge("c", "d")
            .build()
            .unwrap()
    }

    fn sorted_names(graph: &Graph, ids: Vec<NodeId>) -> Vec<&str> {
        let mut names: Vec<_> = ids.into_iter().map(|id| graph.node(id).name()).collect();
        names.sort();
        names
    }

    #[test]
    fn ready_set_surfaces_each_node_once() {
        let graph = GraphBuilder::new("flat")
            .sync_node("x", noop)
            .sync_node("y", noop)
            .sync_node("z", noop)
            .build()
            .unwrap();
        let mut tracker = ReadinessTracker::new(&graph);

        assert_eq!(sorted_names(&graph, tracker.ready_set()), ["x", "y", "z"]);
        assert!(tracker.ready_set().is_empty());
    }

    #[test]
    fn completed_returns_successors_exactly_when_unblocked() {
        let graph = diamond();
        let id = |n: &str| graph.id_of(n).unwrap();
        let mut tracker = ReadinessTracker::new(&graph);

        assert_eq!(sorted_names(&graph, tracker.ready_set()), ["a"]);
        assert_eq!(sorted_names(&graph, tracker.completed(id("a"))), ["b", "c"]);
        assert!(tracker.completed(id("b")).is_empty());
        assert!(!tracker.empty());
        assert_eq!(sorted_names(&graph, tracker.completed(id("c"))), ["d"]);

        // d was surfaced through completed(); ready_set must not repeat it.
        assert!(tracker.ready_set().is_empty());
        assert!(tracker.completed(id("d")).is_empty());
        assert!(tracker.empty());
        assert!(tracker.pending().is_empty());
    }

    #[test]
    #[should_panic(expected = "completed() called for node 'b'")]
    fn completing_a_blocked_node_panics() {
        let graph = diamond();
        let mut tracker = ReadinessTracker::new(&graph);
        tracker.completed(graph.id_of("b").unwrap());
    }

    #[test]
    #[should_panic(expected = "in state Done")]
    fn completing_twice_panics() {
        let graph = diamond();
        let a = graph.id_of("a").unwrap();
        let mut tracker = ReadinessTracker::new(&graph);
        tracker.ready_set();
        tracker.completed(a);
        tracker.completed(a);
    }

    #[test]
    fn cycle_leaves_nodes_pending() {
        let graph = GraphBuilder::new("cycle")
            .sync_node("a", noop)
            .sync_node("b", noop)
            .edge("a", "b")
            .edge("b", "a")
            .build()
            .unwrap();
        let mut tracker = ReadinessTracker::new(&graph);

        assert!(tracker.ready_set().is_empty());
        assert!(!tracker.empty());
        let mut pending = tracker.pending();
        pending.sort();
        assert_eq!(pending, ["a", "b"]);
    }
}
