//! Errors returned by staged locks.
//!
//! Only conditions a caller can reasonably handle are errors. Releasing a
//! stage that isn't held, or unlocking a lock with no outstanding holder, is a
//! bug in the calling code and panics instead.
use thiserror::Error;

/// An error returned when a [`StagedLock`](crate::StagedLock) definition is
/// invalid.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Fewer than two distinct stages were configured.
    ///
    /// A staged lock over a single stage can never exclude anyone, so it is
    /// refused.
    #[error("a staged lock needs at least two stages, but {stages} were defined")]
    TooFewStages {
        /// The number of stages that were defined.
        stages: usize,
    },

    /// The same stage was configured more than once.
    #[error("stage {stage} was defined more than once")]
    DuplicateStage {
        /// The duplicated stage, formatted with its `Debug` implementation.
        stage: String,
    },

    /// A [`LockStrategy`](crate::LockStrategy) could not be parsed from text.
    #[error("unknown lock strategy {0:?} (expected \"passthrough\" or \"exclusive\")")]
    UnknownStrategy(String),
}

/// An error returned when looking up a stage that is not part of a
/// [`StagedLock`](crate::StagedLock).
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("no lock for stage {stage}")]
pub struct UnknownStage {
    pub(crate) stage: String,
}

/// An error indicating that an interruptible wait was cancelled through its
/// [`Interrupt`](crate::Interrupt) before the lock was acquired.
///
/// When this is returned, the attempt left no trace: no holder was counted
/// and no stage was activated.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[error("interrupted while waiting for a staged lock")]
pub struct Interrupted(pub(crate) ());

impl UnknownStage {
    /// Returns the requested stage, formatted with its `Debug` implementation.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }
}
