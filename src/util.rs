//! Internal utilities: logging macros, formatting helpers, and test support.

#[cfg(any(test, feature = "tracing"))]
macro_rules! trace {
    ($($t:tt)*) => { tracing::trace!($($t)*) }
}

#[cfg(not(any(test, feature = "tracing")))]
macro_rules! trace {
    ($($t:tt)*) => {{}};
}

#[cfg(any(test, feature = "tracing"))]
macro_rules! debug {
    ($($t:tt)*) => { tracing::debug!($($t)*) }
}

#[cfg(not(any(test, feature = "tracing")))]
macro_rules! debug {
    ($($t:tt)*) => {{}};
}

/// Logs and then panics with the same message.
///
/// Used for protocol violations: misuse by the caller that must never be
/// silently absorbed.
macro_rules! violation {
    ($($arg:tt)+) => {{
        #[cfg(any(test, feature = "tracing"))]
        tracing::error!($($arg)+);
        panic!($($arg)+)
    }};
}

pub(crate) mod fmt;

#[cfg(test)]
pub(crate) mod test {
    use tracing_subscriber::{
        filter::{EnvFilter, LevelFilter},
        util::SubscriberInitExt,
    };

    /// Keeps the test's fmt subscriber installed as the default until dropped.
    #[must_use]
    pub(crate) struct TestGuard(tracing::subscriber::DefaultGuard);

    /// Installs a fmt subscriber for the current test.
    ///
    /// Filtering comes from `RUST_LOG` (`LOOM_LOG` under loom), and falls back
    /// to tracing everything in this crate.
    pub(crate) fn trace_init() -> TestGuard {
        let var = if cfg!(loom) { "LOOM_LOG" } else { "RUST_LOG" };
        let filter = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());
        let filter = match std::env::var(var) {
            Ok(directives) if !directives.is_empty() => filter.parse_lossy(directives),
            _ => filter.parse_lossy("staged_lock=trace"),
        };

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .with_test_writer()
            .without_time()
            .finish();
        TestGuard(subscriber.set_default())
    }

    pub(crate) fn assert_send_sync<T: Send + Sync>() {}
}
