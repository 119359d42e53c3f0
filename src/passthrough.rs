//! A stage lock admitting any number of concurrent holders.
//!
//! # Implementation Notes
//!
//! The holders are counted under a mutex, together with a phase tag:
//!
//! ```text
//!            lock (gate entered)
//!   Idle ──▶ Acquiring ──────────▶ Held ◀─┐ lock / unlock (count > 1)
//!    ▲  ▲        │ timed out,        │  └──┘
//!    │  └────────┘ interrupted       │ unlock (count 1 → 0)
//!    │                               ▼
//!    └──────────── gate released ── Draining
//! ```
//!
//! Only the caller that moves the lock out of `Idle` touches the gate on the
//! way in, and only the caller that moves it into `Draining` touches it on the
//! way out. Both do so *outside* the critical section, so while the gate call
//! is in flight other lockers see `Acquiring` or `Draining` and park on the
//! lock's monitor until the phase settles, rather than counting themselves in
//! against a stage that isn't (or is no longer) active.
use crate::{
    deadline::Deadline,
    error::Interrupted,
    gate::{GateBinding, Stage},
    interrupt::Interrupt,
    lock::RawStageLock,
    monitor::Monitor,
    util::fmt,
};
use std::{sync::Arc, time::Duration};

/// A stage lock that any number of callers may hold at once.
///
/// The first caller to lock enters the stage on everyone's behalf; the stage
/// is left when the last holder unlocks. Until then, other stages stay locked
/// out, no matter how many holders come and go, and each `unlock` must match
/// exactly one successful `lock`.
///
/// Cloning a `PassthroughLock` returns another handle to the same lock.
pub struct PassthroughLock<S> {
    holders: Arc<Monitor<Holders>>,
    binding: GateBinding<S>,
}

#[derive(Debug)]
struct Holders {
    phase: Phase,
    count: usize,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Phase {
    /// Nobody holds the lock and the stage is not entered.
    Idle,
    /// One caller is entering the stage.
    Acquiring,
    /// The stage is entered and `count` callers hold the lock.
    Held,
    /// The last holder is leaving the stage.
    Draining,
}

enum Step {
    Joined,
    Enter,
}

impl<S: Stage> PassthroughLock<S> {
    /// Returns a new `PassthroughLock` entering its stage through `binding`.
    #[must_use]
    pub fn new(binding: GateBinding<S>) -> Self {
        Self {
            holders: Arc::new(Monitor::new(Holders {
                phase: Phase::Idle,
                count: 0,
            })),
            binding,
        }
    }

    /// Returns the stage this lock is for.
    #[must_use]
    pub fn stage(&self) -> &S {
        self.binding.stage()
    }

    /// Returns the number of callers currently holding this lock.
    #[must_use]
    pub fn holders(&self) -> usize {
        self.holders.lock().count
    }

    fn lock_until(
        &self,
        deadline: Deadline,
        interrupt: Option<&Interrupt>,
    ) -> Result<bool, Interrupted> {
        let step = self
            .holders
            .wait_for(deadline, interrupt, |holders| match holders.phase {
                Phase::Held => {
                    holders.count += 1;
                    Some(Step::Joined)
                }
                Phase::Idle => {
                    holders.phase = Phase::Acquiring;
                    Some(Step::Enter)
                }
                Phase::Acquiring | Phase::Draining => None,
            })?;

        match step {
            None => {
                trace!(stage = ?self.stage(), "PassthroughLock::lock -> timed out");
                Ok(false)
            }
            Some(Step::Joined) => {
                trace!(stage = ?self.stage(), "PassthroughLock::lock -> joined");
                Ok(true)
            }
            Some(Step::Enter) => {
                let entered = self.binding.acquire_until(deadline, interrupt);
                self.holders.update(|holders| {
                    debug_assert_eq!(holders.phase, Phase::Acquiring);
                    if let Ok(true) = entered {
                        holders.phase = Phase::Held;
                        holders.count = 1;
                    } else {
                        // Never entered, so there is nothing to release.
                        holders.phase = Phase::Idle;
                    }
                });
                trace!(stage = ?self.stage(), ?entered, "PassthroughLock::lock -> entered stage");
                entered
            }
        }
    }
}

impl<S: Stage> RawStageLock for PassthroughLock<S> {
    fn lock(&self) {
        match self.lock_until(Deadline::Never, None) {
            Ok(true) => {}
            res => unreachable!(
                "an unbounded, uninterruptible lock of stage {:?} returned {:?}",
                self.stage(),
                res
            ),
        }
    }

    fn lock_interruptibly(&self, interrupt: &Interrupt) -> Result<(), Interrupted> {
        match self.lock_until(Deadline::Never, Some(interrupt))? {
            true => Ok(()),
            false => unreachable!("an unbounded lock of stage {:?} timed out", self.stage()),
        }
    }

    fn try_lock(&self) -> bool {
        self.lock_until(Deadline::Now, None).unwrap_or(false)
    }

    fn try_lock_for(&self, timeout: Duration) -> bool {
        self.lock_until(Deadline::after(Some(timeout)), None)
            .unwrap_or(false)
    }

    fn try_lock_for_interruptibly(
        &self,
        timeout: Duration,
        interrupt: &Interrupt,
    ) -> Result<bool, Interrupted> {
        self.lock_until(Deadline::after(Some(timeout)), Some(interrupt))
    }

    #[track_caller]
    fn unlock(&self) {
        let last = {
            let mut holders = self.holders.lock();
            let phase = holders.phase;
            match phase {
                Phase::Held if holders.count > 1 => {
                    holders.count -= 1;
                    Ok(false)
                }
                Phase::Held => {
                    holders.count = 0;
                    holders.phase = Phase::Draining;
                    Ok(true)
                }
                phase => Err(phase),
            }
        };

        match last {
            Ok(false) => trace!(stage = ?self.stage(), "PassthroughLock::unlock -> left"),
            Ok(true) => {
                self.binding.release();
                self.holders.update(|holders| holders.phase = Phase::Idle);
                trace!(stage = ?self.stage(), "PassthroughLock::unlock -> drained");
            }
            Err(phase) => violation!(
                "cannot unlock the passthrough lock for stage {:?}: it has no holders (phase: {:?})",
                self.stage(),
                phase
            ),
        }
    }

    fn is_locked(&self) -> bool {
        self.holders() > 0
    }
}

impl<S: Clone> Clone for PassthroughLock<S> {
    fn clone(&self) -> Self {
        Self {
            holders: self.holders.clone(),
            binding: self.binding.clone(),
        }
    }
}

impl<S: Stage> fmt::Debug for PassthroughLock<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Holders { phase, count } = *self.holders.lock();
        f.debug_struct("PassthroughLock")
            .field("stage", self.stage())
            .field("phase", &phase)
            .field("holders", &count)
            .finish()
    }
}
