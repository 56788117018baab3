// tests/runner_ordering.rs

mod common;
use crate::common::{Phase, Recorder, init_tracing, with_timeout};

use std::collections::HashSet;
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use proptest::prelude::*;

use dagrun::dag::{Graph, GraphBuilder};
use dagrun::engine::{RunMode, RunnerOptions, run_graph};
use dagrun::{run_concurrent, run_concurrent_mixed, run_sequential};

type TestResult = Result<(), Box<dyn Error>>;

const MODES: [RunMode; 3] = [RunMode::Sequential, RunMode::Concurrent, RunMode::ConcurrentMixed];

/// a -> {b, c} -> d, with b and c async so they can overlap.
fn diamond(rec: &Recorder) -> Graph {
    let mut builder = GraphBuilder::new("diamond");
    builder = rec.sync_node(builder, "a");
    builder = rec.async_node(builder, "b", Duration::from_millis(20));
    builder = rec.async_node(builder, "c", Duration::from_millis(5));
    builder = rec.sync_node(builder, "d");
    builder
        .edge("a", "b")
        .edge("a", "c")
        .edge("b", "d")
        .edge("c", "d")
        .build()
        .expect("diamond builds")
}

#[tokio::test]
async fn diamond_respects_edges_under_every_runner() -> TestResult {
    init_tracing();

    for mode in MODES {
        let rec = Recorder::new();
        let graph = diamond(&rec);

        with_timeout(run_graph(&graph, mode, RunnerOptions::default())).await?;

        rec.assert_respects(&graph);
        let a_done = rec.tick_of("a", Phase::Finish).unwrap();
        let d_start = rec.tick_of("d", Phase::Start).unwrap();
        for mid in ["b", "c"] {
            assert!(a_done < rec.tick_of(mid, Phase::Start).unwrap(), "{mode:?}");
            assert!(rec.tick_of(mid, Phase::Finish).unwrap() < d_start, "{mode:?}");
        }
    }
    Ok(())
}

#[tokio::test]
async fn concurrent_runner_overlaps_independent_async_nodes() -> TestResult {
    init_tracing();
    let rec = Recorder::new();
    let graph = diamond(&rec);

    with_timeout(run_concurrent(&graph)).await?;

    // c is shorter than b, so both must have started before either finished.
    let b_start = rec.tick_of("b", Phase::Start).unwrap();
    let c_start = rec.tick_of("c", Phase::Start).unwrap();
    let c_done = rec.tick_of("c", Phase::Finish).unwrap();
    assert!(b_start < c_done && c_start < c_done);
    assert!(c_done < rec.tick_of("b", Phase::Finish).unwrap());
    Ok(())
}

#[tokio::test]
async fn sequential_runner_never_overlaps() -> TestResult {
    init_tracing();
    let rec = Recorder::new();
    let graph = diamond(&rec);

    with_timeout(run_sequential(&graph)).await?;

    // Start/finish pairs are adjacent in the log.
    let stamps = rec.stamps();
    for pair in stamps.chunks(2) {
        assert_eq!(pair[0].node, pair[1].node);
        assert_eq!(pair[0].phase, Phase::Start);
        assert_eq!(pair[1].phase, Phase::Finish);
    }
    Ok(())
}

#[tokio::test]
async fn mixed_runner_drains_sync_chain_before_starting_tasks() -> TestResult {
    init_tracing();
    let rec = Recorder::new();

    let mut builder = GraphBuilder::new("mixed");
    builder = rec.async_node(builder, "fetch", Duration::ZERO);
    builder = rec.sync_node(builder, "s1");
    builder = rec.sync_node(builder, "s2");
    builder = rec.sync_node(builder, "s3");
    let graph = builder.edge("s1", "s2").edge("s2", "s3").build()?;

    with_timeout(run_concurrent_mixed(&graph)).await?;

    rec.assert_respects(&graph);
    let fetch_start = rec.tick_of("fetch", Phase::Start).unwrap();
    assert!(rec.tick_of("s3", Phase::Finish).unwrap() < fetch_start);
    Ok(())
}

#[tokio::test]
async fn empty_graph_completes_under_every_runner() -> TestResult {
    init_tracing();
    let graph = GraphBuilder::new("empty").build()?;
    assert!(graph.is_empty());

    for mode in MODES {
        with_timeout(run_graph(&graph, mode, RunnerOptions::default())).await?;
    }
    Ok(())
}

#[tokio::test]
async fn one_graph_backs_concurrent_runs() -> TestResult {
    init_tracing();
    let hits = Arc::new(AtomicUsize::new(0));

    let mut builder = GraphBuilder::new("shared");
    for name in ["a", "b", "c"] {
        let hits = Arc::clone(&hits);
        builder = builder.async_node(name, move || {
            let hits = Arc::clone(&hits);
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                hits.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(())
            }
        });
    }
    let graph = builder.edge("a", "b").edge("a", "c").build()?;

    let (first, second) = with_timeout(async {
        tokio::join!(run_concurrent(&graph), run_concurrent_mixed(&graph))
    })
    .await;
    first?;
    second?;
    run_sequential(&graph).await?;

    assert_eq!(hits.load(Ordering::SeqCst), 9);
    Ok(())
}

/// Random acyclic graph: node `i` may only depend on nodes `0..i`. Even
/// nodes are sync, odd nodes async.
fn random_graph(rec: &Recorder, deps: &[Vec<usize>]) -> Graph {
    let mut builder = GraphBuilder::new("random");
    for i in 0..deps.len() {
        let name = format!("n{i}");
        builder = if i % 2 == 0 {
            rec.sync_node(builder, &name)
        } else {
            rec.async_node(builder, &name, Duration::ZERO)
        };
    }

    for (i, potential) in deps.iter().enumerate() {
        let valid: HashSet<usize> = potential.iter().filter(|_| i > 0).map(|d| d % i.max(1)).collect();
        for dep in valid {
            builder = builder.edge(format!("n{dep}"), format!("n{i}"));
        }
    }

    builder.build().expect("random graph builds")
}

fn deps_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_nodes).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), n)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn every_runner_respects_random_dags(deps in deps_strategy(12)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        for mode in MODES {
            let rec = Recorder::new();
            let graph = random_graph(&rec, &deps);

            let result = rt.block_on(run_graph(&graph, mode, RunnerOptions::default()));
            prop_assert!(result.is_ok(), "{:?} failed: {:?}", mode, result);
            rec.assert_respects(&graph);
        }
    }
}
