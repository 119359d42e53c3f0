//! The [`StagedLock`] facade.
use crate::{
    error::{ConfigError, UnknownStage},
    gate::{Stage, StageGate},
    lock::{LockStrategy, StageLock},
    util::fmt,
};
use std::collections::{hash_map::Entry, HashMap};

/// A set of per-stage locks sharing one [`StageGate`].
///
/// Each configured stage gets its own [`StageLock`], exclusive or passthrough
/// according to its [`LockStrategy`]. Holding any stage's lock keeps every
/// other stage's lock from being acquired until all holders have unlocked.
///
/// The set of stages is fixed at construction. Cloning a `StagedLock` returns
/// another handle to the same locks.
///
/// # Examples
///
/// ```
/// use staged_lock::{RawStageLock, StagedLock};
///
/// let lock = StagedLock::builder()
///     .passthrough("read")
///     .exclusive("write")
///     .build()
///     .unwrap();
///
/// let read = lock.get_lock(&"read").unwrap();
/// let write = lock.get_lock(&"write").unwrap();
///
/// assert!(read.try_lock());
/// assert!(read.try_lock());
/// assert!(!write.try_lock());
///
/// read.unlock();
/// read.unlock();
/// assert!(write.try_lock());
/// assert_eq!(lock.active_stage(), Some("write"));
/// write.unlock();
/// ```
pub struct StagedLock<S> {
    gate: StageGate<S>,
    locks: HashMap<S, StageLock<S>>,
}

/// Builds a [`StagedLock`] one stage at a time.
///
/// Returned by [`StagedLock::builder`].
#[derive(Debug)]
#[must_use = "a builder does nothing unless `build` is called"]
pub struct Builder<S> {
    stages: Vec<(S, LockStrategy)>,
}

// === impl StagedLock ===

impl<S: Stage> StagedLock<S> {
    /// Returns a new `StagedLock` with one lock per `(stage, strategy)` pair.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::DuplicateStage`] if the same stage appears twice.
    /// - [`ConfigError::TooFewStages`] if fewer than two stages are given.
    pub fn new(
        stages: impl IntoIterator<Item = (S, LockStrategy)>,
    ) -> Result<Self, ConfigError> {
        let gate = StageGate::new();
        let mut locks = HashMap::new();
        for (stage, strategy) in stages {
            match locks.entry(stage) {
                Entry::Occupied(entry) => {
                    return Err(ConfigError::DuplicateStage {
                        stage: format!("{:?}", entry.key()),
                    })
                }
                Entry::Vacant(entry) => {
                    let binding = gate.bind(entry.key().clone());
                    entry.insert(strategy.build(binding));
                }
            }
        }

        if locks.len() < 2 {
            return Err(ConfigError::TooFewStages {
                stages: locks.len(),
            });
        }

        debug!(
            stages = ?locks.values().map(|lock| (lock.stage(), lock.strategy())).collect::<Vec<_>>(),
            "StagedLock::new"
        );
        Ok(Self { gate, locks })
    }

    /// Returns a [`Builder`] for configuring a `StagedLock` stage by stage.
    pub fn builder() -> Builder<S> {
        Builder { stages: Vec::new() }
    }

    /// Returns the lock for `stage`.
    ///
    /// # Errors
    ///
    /// [`UnknownStage`] if `stage` was not configured.
    pub fn get_lock(&self, stage: &S) -> Result<&StageLock<S>, UnknownStage> {
        self.locks.get(stage).ok_or_else(|| UnknownStage {
            stage: format!("{stage:?}"),
        })
    }

    /// Returns the currently active stage, if any.
    ///
    /// See [`StageGate::active_stage`].
    #[must_use]
    pub fn active_stage(&self) -> Option<S> {
        self.gate.active_stage()
    }

    /// Returns an iterator over the configured stages, in arbitrary order.
    pub fn stages(&self) -> impl Iterator<Item = &S> + '_ {
        self.locks.keys()
    }

    /// Returns the [`LockStrategy`] configured for `stage`, or `None` if
    /// `stage` was not configured.
    #[must_use]
    pub fn strategy(&self, stage: &S) -> Option<LockStrategy> {
        self.locks.get(stage).map(StageLock::strategy)
    }

    /// Returns the gate shared by every stage's lock.
    #[must_use]
    pub fn gate(&self) -> &StageGate<S> {
        &self.gate
    }
}

impl<S: Stage> Clone for StagedLock<S> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            locks: self.locks.clone(),
        }
    }
}

impl<S: Stage> fmt::Debug for StagedLock<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagedLock")
            .field("gate", &self.gate)
            .field("locks", &self.locks)
            .finish()
    }
}

// === impl Builder ===

impl<S: Stage> Builder<S> {
    /// Adds `stage`, locked according to `strategy`.
    pub fn stage(mut self, stage: S, strategy: LockStrategy) -> Self {
        self.stages.push((stage, strategy));
        self
    }

    /// Adds `stage` with [`LockStrategy::Exclusive`].
    pub fn exclusive(self, stage: S) -> Self {
        self.stage(stage, LockStrategy::Exclusive)
    }

    /// Adds `stage` with [`LockStrategy::Passthrough`].
    pub fn passthrough(self, stage: S) -> Self {
        self.stage(stage, LockStrategy::Passthrough)
    }

    /// Builds the [`StagedLock`].
    ///
    /// # Errors
    ///
    /// See [`StagedLock::new`].
    pub fn build(self) -> Result<StagedLock<S>, ConfigError> {
        StagedLock::new(self.stages)
    }
}
