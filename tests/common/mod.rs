//! Shared test support.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber for the test binary; later calls are no-ops.
///
/// Filtered through `RUST_LOG`, so `RUST_LOG=eventry=trace cargo test`
/// shows the emitter's funneling and the stream teardown as they happen.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
