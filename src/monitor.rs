//! A mutex-guarded state value paired with a condition variable.
//!
//! Every blocking wait in this crate is a [`Monitor::wait_for`] call: the
//! readiness predicate is evaluated and acted on inside the same critical
//! section that the condition variable releases while parked, so a
//! notification can never slip in between a failed check and the wait.
use crate::{
    deadline::Deadline,
    error::Interrupted,
    interrupt::Interrupt,
    loom::sync::{Condvar, Mutex, MutexGuard, PoisonError},
    util::fmt,
};
use std::{sync::Arc, time::Duration};

/// Something a thread may be parked on, which can be asked to wake all of its
/// waiters so they re-check their conditions.
pub(crate) trait Unpark: Send + Sync {
    fn unpark_all(&self);
}

pub(crate) struct Monitor<T> {
    state: Mutex<T>,
    cond: Condvar,
}

impl<T> Monitor<T> {
    #[track_caller]
    pub(crate) fn new(state: T) -> Self {
        Self {
            state: Mutex::new(state),
            cond: Condvar::new(),
        }
    }

    /// Locks the state.
    ///
    /// Poisoning is ignored: nothing in this crate panics while holding a
    /// monitor's lock, and the guarded state is always left consistent.
    pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with the state locked, then wakes every waiter.
    pub(crate) fn update<U>(&self, f: impl FnOnce(&mut T) -> U) -> U {
        let ret = f(&mut self.lock());
        self.cond.notify_all();
        ret
    }
}

impl<T: Send + 'static> Monitor<T> {
    /// Waits until `ready` returns `Some`, the deadline passes, or `interrupt`
    /// is triggered.
    ///
    /// `ready` is called with the state locked, and must only mutate the
    /// state when it returns `Some`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))` once `ready` returned `Some(value)`.
    /// - `Ok(None)` if the deadline passed first.
    /// - `Err(Interrupted)` if `interrupt` was triggered first. An interrupt
    ///   that was already triggered wins even if `ready` would have
    ///   succeeded immediately.
    pub(crate) fn wait_for<U>(
        self: &Arc<Self>,
        deadline: Deadline,
        interrupt: Option<&Interrupt>,
        mut ready: impl FnMut(&mut T) -> Option<U>,
    ) -> Result<Option<U>, Interrupted> {
        // Register with the interrupt before the first check of its flag, so
        // that an interrupt racing with us either is observed by the check or
        // finds us registered and wakes us.
        let _parked = match interrupt {
            Some(interrupt) if deadline != Deadline::Now => {
                Some(interrupt.park(self.clone() as Arc<dyn Unpark>))
            }
            _ => None,
        };

        let mut state = self.lock();
        loop {
            if interrupt.is_some_and(Interrupt::is_interrupted) {
                debug!("Monitor::wait_for -> interrupted");
                return Err(Interrupted(()));
            }

            if let Some(ready) = ready(&mut state) {
                return Ok(Some(ready));
            }

            state = match deadline.remaining() {
                None => {
                    trace!("Monitor::wait_for -> parking");
                    self.cond
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner)
                }
                Some(remaining) if remaining == Duration::ZERO => {
                    trace!("Monitor::wait_for -> timed out");
                    return Ok(None);
                }
                Some(remaining) => {
                    trace!(?remaining, "Monitor::wait_for -> parking");
                    self.cond
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}

impl<T: Send + 'static> Unpark for Monitor<T> {
    fn unpark_all(&self) {
        // Taking the lock orders this wakeup after any waiter that is between
        // its interrupt check and parking.
        drop(self.lock());
        self.cond.notify_all();
    }
}

impl<T: fmt::Debug> fmt::Debug for Monitor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_lock() {
            Ok(state) => f.debug_tuple("Monitor").field(&*state).finish(),
            Err(_) => f.write_str("Monitor(<locked>)"),
        }
    }
}
