#![allow(dead_code, unused_imports)]

use std::time::Duration;

use dagrun::dag::NodeResult;

pub use dagrun_test_utils::builders;
pub use dagrun_test_utils::recorder::{Phase, Recorder};
pub use dagrun_test_utils::{DEFAULT_TIMEOUT, init_tracing, with_timeout, within};

/// Body of an async node that fails after `delay`.
pub async fn fail_after(delay: Duration, msg: &'static str) -> NodeResult {
    tokio::time::sleep(delay).await;
    Err(anyhow::anyhow!(msg))
}

/// Body of an async node that succeeds after `delay`.
pub async fn succeed_after(delay: Duration) -> NodeResult {
    tokio::time::sleep(delay).await;
    Ok(())
}
