//! Execution recorder: a global logical clock plus per-node start/finish
//! stamps, used to check ordering guarantees.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dagrun::dag::{Graph, GraphBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Finish,
}

#[derive(Debug, Clone)]
pub struct Stamp {
    pub node: String,
    pub phase: Phase,
    pub tick: u64,
}

/// Cheap to clone; clones share the clock and the log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    clock: Arc<AtomicU64>,
    stamps: Arc<Mutex<Vec<Stamp>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(&self, node: &str, phase: Phase) {
        let mut stamps = self.stamps.lock().unwrap();
        let tick = self.clock.fetch_add(1, Ordering::SeqCst);
        stamps.push(Stamp {
            node: node.to_string(),
            phase,
            tick,
        });
    }

    pub fn stamps(&self) -> Vec<Stamp> {
        self.stamps.lock().unwrap().clone()
    }

    /// Nodes in the order they started.
    pub fn started(&self) -> Vec<String> {
        self.stamps()
            .into_iter()
            .filter(|s| s.phase == Phase::Start)
            .map(|s| s.node)
            .collect()
    }

    pub fn count(&self, node: &str, phase: Phase) -> usize {
        self.stamps
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.node == node && s.phase == phase)
            .count()
    }

    pub fn tick_of(&self, node: &str, phase: Phase) -> Option<u64> {
        self.stamps
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.node == node && s.phase == phase)
            .map(|s| s.tick)
    }

    /// Sync node that stamps start and finish around nothing.
    pub fn sync_node(&self, builder: GraphBuilder, name: &str) -> GraphBuilder {
        let rec = self.clone();
        let node = name.to_string();
        builder.sync_node(name, move || {
            rec.stamp(&node, Phase::Start);
            rec.stamp(&node, Phase::Finish);
            Ok(())
        })
    }

    /// Async node that stamps its start, suspends (for `delay`, or just
    /// yields when `delay` is zero) and stamps its finish.
    pub fn async_node(&self, builder: GraphBuilder, name: &str, delay: Duration) -> GraphBuilder {
        let rec = self.clone();
        let node = name.to_string();
        builder.async_node(name, move || {
            let rec = rec.clone();
            let node = node.clone();
            async move {
                rec.stamp(&node, Phase::Start);
                if delay.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(delay).await;
                }
                rec.stamp(&node, Phase::Finish);
                Ok::<_, anyhow::Error>(())
            }
        })
    }

    /// Every node ran exactly once and every predecessor finished strictly
    /// before its successor started.
    pub fn assert_respects(&self, graph: &Graph) {
        for (_, node) in graph.nodes() {
            assert_eq!(self.count(node.name(), Phase::Start), 1, "{} start count", node.name());
            assert_eq!(self.count(node.name(), Phase::Finish), 1, "{} finish count", node.name());
        }

        for (p, s) in graph.edges() {
            let (p, s) = (graph.node(p).name(), graph.node(s).name());
            let finished = self.tick_of(p, Phase::Finish).unwrap();
            let started = self.tick_of(s, Phase::Start).unwrap();
            assert!(
                finished < started,
                "{p} finished at {finished} but {s} started at {started}"
            );
        }
    }
}
