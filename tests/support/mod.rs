#![allow(dead_code)]
use staged_lock::{LockStrategy, StagedLock};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    util::SubscriberInitExt,
};

/// Installs a fmt subscriber for the rest of the test.
///
/// The filter is read from `RUST_LOG`, defaulting to `staged_lock=debug`.
pub fn trace_init() -> tracing::subscriber::DefaultGuard {
    let env = std::env::var("RUST_LOG").unwrap_or_default();
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());
    let filter = if env.is_empty() {
        builder.parse("staged_lock=debug").unwrap()
    } else {
        builder.parse_lossy(env)
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_thread_names(true)
        .without_time()
        .finish()
        .set_default()
}

/// Returns a staged lock over stages `"a"` and `"b"`, both using `strategy`.
pub fn two_stages(strategy: LockStrategy) -> StagedLock<&'static str> {
    StagedLock::new([("a", strategy), ("b", strategy)]).unwrap()
}
