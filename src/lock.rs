//! The per-stage lock interface, and the lock type returned by
//! [`StagedLock`](crate::StagedLock).
use crate::{
    error::{ConfigError, Interrupted},
    exclusive::ExclusiveLock,
    gate::{GateBinding, Stage},
    interrupt::Interrupt,
    passthrough::PassthroughLock,
    util::fmt,
};
use core::str::FromStr;
use std::time::Duration;

/// Trait abstracting over stage lock implementations.
///
/// Every method that succeeds in acquiring the lock must be paired with
/// exactly one call to [`unlock`]. Stage locks are not associated with the
/// thread that locked them: any thread may unlock a hold acquired on another.
///
/// [`unlock`]: RawStageLock::unlock
pub trait RawStageLock {
    /// Acquires this lock, blocking the current thread until it is able to do
    /// so.
    fn lock(&self);

    /// Acquires this lock, blocking the current thread until it is able to do
    /// so or `interrupt` is triggered.
    ///
    /// If `interrupt` was already triggered, this returns an error without
    /// waiting, even if the lock is available.
    ///
    /// # Errors
    ///
    /// [`Interrupted`] if the wait was cancelled. The lock is then left
    /// exactly as if this method had never been called.
    fn lock_interruptibly(&self, interrupt: &Interrupt) -> Result<(), Interrupted>;

    /// Attempts to acquire this lock without blocking. Returns `true` if the
    /// lock was successfully acquired and `false` otherwise.
    fn try_lock(&self) -> bool;

    /// Attempts to acquire this lock, blocking for at most `timeout`. Returns
    /// `true` if the lock was successfully acquired and `false` otherwise.
    ///
    /// The bound covers the whole attempt, however many internal waits it
    /// takes. A zero `timeout` behaves like [`try_lock`](Self::try_lock).
    fn try_lock_for(&self, timeout: Duration) -> bool;

    /// Attempts to acquire this lock, blocking for at most `timeout` or until
    /// `interrupt` is triggered.
    ///
    /// # Errors
    ///
    /// [`Interrupted`] if the wait was cancelled before the lock was acquired
    /// or the timeout elapsed.
    fn try_lock_for_interruptibly(
        &self,
        timeout: Duration,
        interrupt: &Interrupt,
    ) -> Result<bool, Interrupted>;

    /// Releases one hold of this lock.
    ///
    /// # Panics
    ///
    /// If the lock has no outstanding hold to release.
    fn unlock(&self);

    /// Returns `true` if this lock currently has at least one holder.
    fn is_locked(&self) -> bool;
}

/// How callers within one stage share it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum LockStrategy {
    /// Any number of callers may hold the stage's lock at once.
    Passthrough,
    /// Only one caller may hold the stage's lock at a time.
    Exclusive,
}

/// The lock for one stage of a [`StagedLock`](crate::StagedLock).
///
/// This is either an [`ExclusiveLock`] or a [`PassthroughLock`], depending on
/// the stage's [`LockStrategy`]. Cloning a `StageLock` returns another handle
/// to the same lock, which can be moved to another thread.
#[derive(Clone)]
pub enum StageLock<S> {
    /// A stage configured with [`LockStrategy::Exclusive`].
    Exclusive(ExclusiveLock<S>),
    /// A stage configured with [`LockStrategy::Passthrough`].
    Passthrough(PassthroughLock<S>),
}

/// An RAII hold of a [`StageLock`]. When this structure is dropped (falls out
/// of scope), the hold is released.
///
/// This structure is created by the [`guard`], [`try_guard`] and
/// [`try_guard_for`] methods on [`StageLock`].
///
/// [`guard`]: StageLock::guard
/// [`try_guard`]: StageLock::try_guard
/// [`try_guard_for`]: StageLock::try_guard_for
#[must_use = "if unused, the stage lock will immediately unlock"]
pub struct StageGuard<'a, S: Stage> {
    lock: &'a StageLock<S>,
}

// === impl LockStrategy ===

impl LockStrategy {
    /// Returns the lock for `binding`'s stage that implements this strategy.
    #[must_use]
    pub fn build<S: Stage>(self, binding: GateBinding<S>) -> StageLock<S> {
        match self {
            Self::Passthrough => StageLock::Passthrough(PassthroughLock::new(binding)),
            Self::Exclusive => StageLock::Exclusive(ExclusiveLock::new(binding)),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::Exclusive => "exclusive",
        }
    }
}

impl fmt::Display for LockStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for LockStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        [Self::Passthrough, Self::Exclusive]
            .into_iter()
            .find(|strategy| strategy.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownStrategy(s.to_owned()))
    }
}

// === impl StageLock ===

impl<S: Stage> StageLock<S> {
    /// Returns the stage this lock is for.
    #[must_use]
    pub fn stage(&self) -> &S {
        match self {
            Self::Exclusive(lock) => lock.stage(),
            Self::Passthrough(lock) => lock.stage(),
        }
    }

    /// Returns this lock's [`LockStrategy`].
    #[must_use]
    pub fn strategy(&self) -> LockStrategy {
        match self {
            Self::Exclusive(_) => LockStrategy::Exclusive,
            Self::Passthrough(_) => LockStrategy::Passthrough,
        }
    }

    /// Acquires this lock, blocking until it is able to do so, and returns a
    /// guard that releases it when dropped.
    pub fn guard(&self) -> StageGuard<'_, S> {
        self.lock();
        StageGuard { lock: self }
    }

    /// Attempts to acquire this lock without blocking, returning a guard that
    /// releases it when dropped.
    #[must_use]
    pub fn try_guard(&self) -> Option<StageGuard<'_, S>> {
        self.try_lock().then(|| StageGuard { lock: self })
    }

    /// Attempts to acquire this lock, blocking for at most `timeout`, and
    /// returns a guard that releases it when dropped.
    #[must_use]
    pub fn try_guard_for(&self, timeout: Duration) -> Option<StageGuard<'_, S>> {
        self.try_lock_for(timeout)
            .then(|| StageGuard { lock: self })
    }
}

impl<S: Stage> RawStageLock for StageLock<S> {
    #[inline]
    fn lock(&self) {
        match self {
            Self::Exclusive(lock) => lock.lock(),
            Self::Passthrough(lock) => lock.lock(),
        }
    }

    #[inline]
    fn lock_interruptibly(&self, interrupt: &Interrupt) -> Result<(), Interrupted> {
        match self {
            Self::Exclusive(lock) => lock.lock_interruptibly(interrupt),
            Self::Passthrough(lock) => lock.lock_interruptibly(interrupt),
        }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        match self {
            Self::Exclusive(lock) => lock.try_lock(),
            Self::Passthrough(lock) => lock.try_lock(),
        }
    }

    #[inline]
    fn try_lock_for(&self, timeout: Duration) -> bool {
        match self {
            Self::Exclusive(lock) => lock.try_lock_for(timeout),
            Self::Passthrough(lock) => lock.try_lock_for(timeout),
        }
    }

    #[inline]
    fn try_lock_for_interruptibly(
        &self,
        timeout: Duration,
        interrupt: &Interrupt,
    ) -> Result<bool, Interrupted> {
        match self {
            Self::Exclusive(lock) => lock.try_lock_for_interruptibly(timeout, interrupt),
            Self::Passthrough(lock) => lock.try_lock_for_interruptibly(timeout, interrupt),
        }
    }

    #[inline]
    #[track_caller]
    fn unlock(&self) {
        match self {
            Self::Exclusive(lock) => lock.unlock(),
            Self::Passthrough(lock) => lock.unlock(),
        }
    }

    #[inline]
    fn is_locked(&self) -> bool {
        match self {
            Self::Exclusive(lock) => lock.is_locked(),
            Self::Passthrough(lock) => lock.is_locked(),
        }
    }
}

impl<S: Stage> fmt::Debug for StageLock<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exclusive(lock) => lock.fmt(f),
            Self::Passthrough(lock) => lock.fmt(f),
        }
    }
}

// === impl StageGuard ===

impl<S: Stage> StageGuard<'_, S> {
    /// Returns the stage this guard holds.
    #[must_use]
    pub fn stage(&self) -> &S {
        self.lock.stage()
    }
}

impl<S: Stage> Drop for StageGuard<'_, S> {
    #[inline]
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

impl<S: Stage> fmt::Debug for StageGuard<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageGuard")
            .field("stage", self.stage())
            .finish()
    }
}

#[cfg(test)]
mod tests;
