#[allow(unused_imports)]
pub(crate) use self::inner::*;

#[cfg(loom)]
mod inner {
    #![allow(unused_imports)]

    pub(crate) mod sync {
        pub(crate) use loom::sync::*;
        pub(crate) use std::sync::{LockResult, PoisonError};
    }

    #[cfg(test)]
    pub(crate) use loom::{model, thread};
}

#[cfg(not(loom))]
mod inner {
    #![allow(dead_code, unused_imports)]

    pub(crate) mod sync {
        pub(crate) use std::sync::*;
    }


    /// Runs `f` once, with tracing enabled.
    ///
    /// This is the non-loom stand-in for `loom::model`, so that the same tests
    /// run both as ordinary tests and as loom models.
    #[cfg(test)]
    pub(crate) fn model(f: impl Fn()) {
        let _trace = crate::util::test::trace_init();
        let test = std::thread::current();
        let _span = tracing::info_span!("model", test = test.name().unwrap_or("<unnamed>")).entered();
        f();
        tracing::debug!("model finished");
    }
}
