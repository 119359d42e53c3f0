//! The stage gate: the single piece of state deciding which stage is active.
//!
//! A [`StageGate`] records at most one active stage. Acquiring the gate for a
//! stage succeeds immediately if no stage is active (making that stage active)
//! or if that same stage is already active; otherwise the caller waits until
//! the active stage is released. Releasing wakes every waiter, and each
//! re-evaluates whether it may now enter. There is no hand-off and no FIFO
//! ordering between waiters.
//!
//! The gate itself does no bookkeeping of *how many* callers entered a stage:
//! re-acquiring an active stage does not change anything, and a single
//! release deactivates the stage. Counting holders is the job of the lock
//! adapters ([`ExclusiveLock`] and [`PassthroughLock`]), which each hold a
//! [`GateBinding`] for their stage.
//!
//! [`ExclusiveLock`]: crate::ExclusiveLock
//! [`PassthroughLock`]: crate::PassthroughLock
use crate::{
    deadline::Deadline, error::Interrupted, interrupt::Interrupt, monitor::Monitor, util::fmt,
};
use std::{hash::Hash, sync::Arc, time::Duration};

/// A stage identity.
///
/// This is implemented for every type that can be used as a stage: anything
/// that can be compared, hashed, cloned, printed for diagnostics, and shared
/// between threads. Enums and strings are the usual choices.
pub trait Stage: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> Stage for T where T: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

/// Arbitrates which stage, if any, is currently active.
///
/// Cloning a `StageGate` returns another handle to the *same* gate.
///
/// # Examples
///
/// ```
/// use staged_lock::StageGate;
///
/// let gate = StageGate::new();
/// assert!(gate.acquire(&"a", None));
/// // Re-entering the active stage never blocks...
/// assert!(gate.acquire(&"a", None));
/// // ...but any other stage has to wait.
/// assert!(!gate.acquire(&"b", Some(std::time::Duration::ZERO)));
///
/// gate.release(&"a");
/// assert!(gate.acquire(&"b", Some(std::time::Duration::ZERO)));
/// ```
pub struct StageGate<S> {
    active: Arc<Monitor<Option<S>>>,
}

/// A [`StageGate`] bound to one fixed stage.
///
/// This is the capability a lock adapter uses to enter and leave its stage,
/// without knowing which stage it is.
pub struct GateBinding<S> {
    gate: StageGate<S>,
    stage: S,
}

// === impl StageGate ===

impl<S: Stage> StageGate<S> {
    /// Returns a new gate with no active stage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: Arc::new(Monitor::new(None)),
        }
    }

    /// Waits until `stage` is the active stage, activating it if no stage is
    /// active.
    ///
    /// - `timeout == None` waits as long as it takes.
    /// - `timeout == Some(Duration::ZERO)` never waits.
    /// - Any other timeout bounds the wait.
    ///
    /// Returns `false` if the timeout elapsed first, in which case nothing
    /// changed.
    pub fn acquire(&self, stage: &S, timeout: Option<Duration>) -> bool {
        match self.acquire_until(stage, Deadline::after(timeout), None) {
            Ok(acquired) => acquired,
            Err(_) => unreachable!("an acquisition without an interrupt cannot be interrupted"),
        }
    }

    /// Like [`acquire`](Self::acquire), but the wait is abandoned with
    /// [`Interrupted`] if `interrupt` is triggered first.
    pub fn acquire_interruptibly(
        &self,
        stage: &S,
        timeout: Option<Duration>,
        interrupt: &Interrupt,
    ) -> Result<bool, Interrupted> {
        self.acquire_until(stage, Deadline::after(timeout), Some(interrupt))
    }

    pub(crate) fn acquire_until(
        &self,
        stage: &S,
        deadline: Deadline,
        interrupt: Option<&Interrupt>,
    ) -> Result<bool, Interrupted> {
        let entered = self.active.wait_for(deadline, interrupt, |active| {
            if active.is_none() {
                trace!(?stage, "StageGate::acquire -> activated");
                *active = Some(stage.clone());
            }
            (active.as_ref() == Some(stage)).then_some(())
        })?;
        if entered.is_none() {
            trace!(?stage, "StageGate::acquire -> timed out");
        }
        Ok(entered.is_some())
    }

    /// Deactivates `stage`, waking every waiter.
    ///
    /// # Panics
    ///
    /// If `stage` is not the active stage. Releasing a stage that was never
    /// acquired (or was already released) is a bug in the caller.
    #[track_caller]
    pub fn release(&self, stage: &S) {
        let released = self.active.update(|active| {
            if active.as_ref() == Some(stage) {
                *active = None;
                Ok(())
            } else {
                Err(active.clone())
            }
        });
        match released {
            Ok(()) => trace!(?stage, "StageGate::release"),
            Err(active) => violation!(
                "cannot release stage {:?}: it is not the active stage (active: {:?})",
                stage,
                active
            ),
        }
    }

    /// Returns the currently active stage, if any.
    ///
    /// The returned value may be stale as soon as it is returned. It is
    /// intended for diagnostics and tests.
    #[must_use]
    pub fn active_stage(&self) -> Option<S> {
        self.active.lock().clone()
    }

    /// Returns `true` if no stage is currently active.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.active.lock().is_none()
    }

    /// Returns a [`GateBinding`] that acquires and releases this gate for
    /// `stage`.
    #[must_use]
    pub fn bind(&self, stage: S) -> GateBinding<S> {
        GateBinding {
            gate: self.clone(),
            stage,
        }
    }
}

impl<S: Stage> Default for StageGate<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for StageGate<S> {
    fn clone(&self) -> Self {
        Self {
            active: self.active.clone(),
        }
    }
}

impl<S: Stage> fmt::Debug for StageGate<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active = self.active_stage();
        f.debug_struct("StageGate")
            .field("active", &fmt::opt(&active).or_else("<none>"))
            .finish()
    }
}

// === impl GateBinding ===

impl<S: Stage> GateBinding<S> {
    /// Returns the stage this binding is for.
    #[must_use]
    pub fn stage(&self) -> &S {
        &self.stage
    }

    /// Returns the gate this binding acquires.
    #[must_use]
    pub fn gate(&self) -> &StageGate<S> {
        &self.gate
    }

    /// Waits as long as it takes to enter the stage.
    pub fn acquire(&self) {
        match self.acquire_until(Deadline::Never, None) {
            Ok(true) => {}
            res => unreachable!(
                "an unbounded, uninterruptible acquisition of stage {:?} returned {:?}",
                self.stage, res
            ),
        }
    }

    /// Waits as long as it takes to enter the stage, unless `interrupt` is
    /// triggered first.
    pub fn acquire_interruptibly(&self, interrupt: &Interrupt) -> Result<(), Interrupted> {
        match self.acquire_until(Deadline::Never, Some(interrupt))? {
            true => Ok(()),
            false => unreachable!(
                "an unbounded acquisition of stage {:?} timed out",
                self.stage
            ),
        }
    }

    /// Tries to enter the stage, waiting at most `timeout` (see
    /// [`StageGate::acquire`]).
    pub fn try_acquire(&self, timeout: Option<Duration>) -> bool {
        self.gate.acquire(&self.stage, timeout)
    }

    /// Tries to enter the stage, waiting at most `timeout`, unless `interrupt`
    /// is triggered first.
    pub fn try_acquire_interruptibly(
        &self,
        timeout: Option<Duration>,
        interrupt: &Interrupt,
    ) -> Result<bool, Interrupted> {
        self.gate
            .acquire_interruptibly(&self.stage, timeout, interrupt)
    }

    pub(crate) fn acquire_until(
        &self,
        deadline: Deadline,
        interrupt: Option<&Interrupt>,
    ) -> Result<bool, Interrupted> {
        self.gate.acquire_until(&self.stage, deadline, interrupt)
    }

    /// Leaves the stage.
    ///
    /// # Panics
    ///
    /// If the stage is not active.
    #[track_caller]
    pub fn release(&self) {
        self.gate.release(&self.stage)
    }
}

impl<S: Clone> Clone for GateBinding<S> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            stage: self.stage.clone(),
        }
    }
}

impl<S: Stage> fmt::Debug for GateBinding<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateBinding")
            .field("stage", &self.stage)
            .field("gate", &self.gate)
            .finish()
    }
}
