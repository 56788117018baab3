use std::str::FromStr;

use clap::ValueEnum;
use serde::Deserialize;

/// Which runner executes a graph.
///
/// - `Sequential`: walk the topological order, one node at a time.
/// - `Concurrent`: every ready node becomes a task; sync nodes are wrapped as
///   already-finished tasks (default).
/// - `ConcurrentMixed`: like `Concurrent`, but sync nodes run inline as soon
///   as they become ready and never occupy a task slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Sequential,
    #[default]
    Concurrent,
    ConcurrentMixed,
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "sequential" => Ok(RunMode::Sequential),
            "concurrent" => Ok(RunMode::Concurrent),
            "concurrent_mixed" | "mixed" => Ok(RunMode::ConcurrentMixed),
            other => Err(format!(
                "invalid mode: {other} (expected \"sequential\", \"concurrent\" or \"concurrent_mixed\")"
            )),
        }
    }
}

/// What a concurrent runner does with still-running siblings once a
/// completion batch contains a failure.
///
/// - `LeaveRunning`: return the failure immediately and leave the siblings
///   alone; the caller decides whether to cancel them (default).
/// - `CancelOutstanding`: cancel every outstanding task before returning,
///   folding any failures seen during teardown into the returned error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    LeaveRunning,
    CancelOutstanding,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "leave_running" => Ok(FailurePolicy::LeaveRunning),
            "cancel_outstanding" | "cancel" => Ok(FailurePolicy::CancelOutstanding),
            other => Err(format!(
                "invalid on_failure: {other} (expected \"leave_running\" or \"cancel_outstanding\")"
            )),
        }
    }
}
