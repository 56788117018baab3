//! Shared helpers for `dagrun` integration tests.

pub mod builders;
pub mod recorder;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use dagrun::logging::LOG_ENV_VAR;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Upper bound for a single graph run in tests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a test-writer subscriber once per test binary.
///
/// Reads the same `DAGRUN_LOG` directives as the binary and defaults to
/// `warn`, so runner warnings (stalls, failed runs) show up in the output of
/// failing tests. Run with `-- --nocapture` to see passing tests too.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// [`within`] using [`DEFAULT_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    within(DEFAULT_TIMEOUT, f).await
}

/// Drive `f` to completion or panic after `limit`. A runner that stalls
/// without noticing fails the test here instead of hanging the suite.
pub async fn within<F, T>(limit: Duration, f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(limit, f).await {
        Ok(out) => out,
        Err(_) => panic!("graph run did not finish within {limit:?}"),
    }
}
