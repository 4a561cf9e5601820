//! Fixtures shared by hpcflow's integration and property tests: workflow
//! builders, a recording executor and a few runtime helpers.

pub mod builders;
pub mod fake_executor;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use hpcflow::logging::LOG_ENV;
use tracing_subscriber::{EnvFilter, fmt};

/// Deadline applied by [`with_timeout`].
pub const TEST_DEADLINE: Duration = Duration::from_secs(5);

/// Install a subscriber that writes through the test harness capture.
///
/// Filtered by `HPCFLOW_LOG` like the binary, defaulting to `hpcflow=info`;
/// output only shows for failing tests unless run with `--nocapture`.
pub fn init_tracing() {
    static SUBSCRIBER: Once = Once::new();

    SUBSCRIBER.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("hpcflow=info"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .without_time()
            .try_init();
    });
}

/// Await `fut`, panicking if the workflow under test has not settled within
/// `limit`.
pub async fn within<T>(limit: Duration, fut: impl Future<Output = T>) -> T {
    match tokio::time::timeout(limit, fut).await {
        Ok(value) => value,
        Err(_) => panic!("hpcflow test did not settle within {limit:?}"),
    }
}

/// [`within`] using [`TEST_DEADLINE`].
pub async fn with_timeout<T>(fut: impl Future<Output = T>) -> T {
    within(TEST_DEADLINE, fut).await
}
