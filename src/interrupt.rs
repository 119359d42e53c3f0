//! Cancellation for blocked lock acquisitions.
//!
//! Rust threads have no built-in interruption, so the interruptible locking
//! methods take an [`Interrupt`] instead. Triggering it wakes every thread
//! currently parked in an interruptible acquisition that was handed a clone of
//! the same `Interrupt`, and makes them return [`Interrupted`].
//!
//! [`Interrupted`]: crate::Interrupted
use crate::{
    loom::sync::{
        atomic::{AtomicBool, Ordering::*},
        Mutex, PoisonError,
    },
    monitor::Unpark,
    util::fmt,
};
use std::sync::Arc;

/// A cloneable handle used to cancel interruptible lock acquisitions.
///
/// All clones share the same flag. Once [`interrupt`] has been called, every
/// interruptible acquisition using this handle fails with
/// [`Interrupted`](crate::Interrupted), including ones started afterwards,
/// until the flag is reset with [`clear`].
///
/// # Examples
///
/// ```
/// use staged_lock::{Interrupt, LockStrategy, RawStageLock, StagedLock};
/// use std::thread;
///
/// let locks = StagedLock::new([
///     ("read", LockStrategy::Passthrough),
///     ("write", LockStrategy::Exclusive),
/// ])
/// .unwrap();
/// locks.get_lock(&"read").unwrap().lock();
///
/// let interrupt = Interrupt::new();
/// thread::scope(|s| {
///     let waiter = s.spawn(|| {
///         locks
///             .get_lock(&"write")
///             .unwrap()
///             .lock_interruptibly(&interrupt)
///     });
///     interrupt.interrupt();
///     assert!(waiter.join().unwrap().is_err());
/// });
/// ```
///
/// [`interrupt`]: Interrupt::interrupt
/// [`clear`]: Interrupt::clear
#[derive(Clone, Default)]
pub struct Interrupt {
    inner: Arc<Inner>,
}

/// Unregisters a parked waiter when dropped.
#[must_use]
pub(crate) struct Parked<'a> {
    interrupt: &'a Interrupt,
    id: u64,
}

struct Inner {
    interrupted: AtomicBool,
    parked: Mutex<Waiters>,
}

#[derive(Default)]
struct Waiters {
    next_id: u64,
    list: Vec<(u64, Arc<dyn Unpark>)>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            interrupted: AtomicBool::new(false),
            parked: Mutex::new(Waiters::default()),
        }
    }
}

// === impl Interrupt ===

impl Interrupt {
    /// Returns a new `Interrupt` that has not been triggered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers this interrupt, waking every acquisition currently waiting on
    /// it.
    pub fn interrupt(&self) {
        self.inner.interrupted.store(true, SeqCst);
        // Clone the list out so that no monitor is locked while holding our own
        // lock: waiters take ours while holding theirs.
        let waiters = self
            .inner
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .list
            .iter()
            .map(|(_, waiter)| waiter.clone())
            .collect::<Vec<_>>();
        debug!(waiters = waiters.len(), "Interrupt::interrupt");
        for waiter in waiters {
            waiter.unpark_all();
        }
    }

    /// Returns `true` if this interrupt has been triggered and not cleared.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.inner.interrupted.load(SeqCst)
    }

    /// Resets this interrupt, so that subsequent acquisitions may wait again.
    pub fn clear(&self) {
        self.inner.interrupted.store(false, SeqCst);
    }

    /// Registers `waiter` to be woken if this interrupt is triggered.
    ///
    /// The registration must happen *before* the waiter's last check of
    /// [`is_interrupted`](Self::is_interrupted) prior to parking.
    pub(crate) fn park(&self, waiter: Arc<dyn Unpark>) -> Parked<'_> {
        let mut parked = self
            .inner
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let id = parked.next_id;
        parked.next_id += 1;
        parked.list.push((id, waiter));
        Parked {
            interrupt: self,
            id,
        }
    }

    fn waiters(&self) -> usize {
        self.inner
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .list
            .len()
    }
}

impl fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupt")
            .field("interrupted", &self.is_interrupted())
            .field("waiters", &self.waiters())
            .finish()
    }
}

// === impl Parked ===

impl Drop for Parked<'_> {
    fn drop(&mut self) {
        let id = self.id;
        self.interrupt
            .inner
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .list
            .retain(|(waiter, _)| *waiter != id);
    }
}
