//! A stage lock admitting a single holder at a time.
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

/// A stage lock that only one caller may hold at a time.
///
/// Even though the [`StageGate`](crate::StageGate) lets any number of callers
/// into an active stage, an `ExclusiveLock` admits only one of them: a second
/// caller locking the same stage waits (or fails) until the first unlocks.
///
/// Locking takes a local token first and then enters the stage; unlocking
/// leaves the stage first and then returns the token. Whenever the stage is
/// active on behalf of this lock, the token is therefore held. A failed or
/// interrupted attempt that got the token but not the stage gives the token
/// back before returning.
///
/// Cloning an `ExclusiveLock` returns another handle to the same lock.
pub struct ExclusiveLock<S> {
    token: Arc<Monitor<Token>>,
    binding: GateBinding<S>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Token {
    Free,
    Held,
    /// The holder has unlocked and is leaving the stage.
    Releasing,
}

impl<S: Stage> ExclusiveLock<S> {
    /// Returns a new `ExclusiveLock` entering its stage through `binding`.
    #[must_use]
    pub fn new(binding: GateBinding<S>) -> Self {
        Self {
            token: Arc::new(Monitor::new(Token::Free)),
            binding,
        }
    }

    /// Returns the stage this lock is for.
    #[must_use]
    pub fn stage(&self) -> &S {
        self.binding.stage()
    }

    fn lock_until(
        &self,
        deadline: Deadline,
        interrupt: Option<&Interrupt>,
    ) -> Result<bool, Interrupted> {
        let took_token = self.token.wait_for(deadline, interrupt, |token| {
            (*token == Token::Free).then(|| *token = Token::Held)
        })?;
        if took_token.is_none() {
            trace!(stage = ?self.stage(), "ExclusiveLock::lock -> already held");
            return Ok(false);
        }

        match self.binding.acquire_until(deadline, interrupt) {
            Ok(true) => {
                trace!(stage = ?self.stage(), "ExclusiveLock::lock -> locked");
                Ok(true)
            }
            res => {
                // Entering the stage failed: give the token back, so the lock
                // doesn't stay "held" by nobody.
                self.token.update(|token| *token = Token::Free);
                trace!(stage = ?self.stage(), ?res, "ExclusiveLock::lock -> token returned");
                res
            }
        }
    }
}

impl<S: Stage> RawStageLock for ExclusiveLock<S> {
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
        // Claim the release in the same critical section as the check, so a
        // second unlock can't also pass it and release a later holder.
        let claimed = {
            let mut token = self.token.lock();
            match *token {
                Token::Held => {
                    *token = Token::Releasing;
                    Ok(())
                }
                state => Err(state),
            }
        };
        if let Err(state) = claimed {
            violation!(
                "cannot unlock the exclusive lock for stage {:?}: it is not locked (token: {:?})",
                self.stage(),
                state
            );
        }

        self.binding.release();
        self.token.update(|token| *token = Token::Free);
        trace!(stage = ?self.stage(), "ExclusiveLock::unlock");
    }

    fn is_locked(&self) -> bool {
        *self.token.lock() != Token::Free
    }
}

impl<S: Clone> Clone for ExclusiveLock<S> {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
            binding: self.binding.clone(),
        }
    }
}

impl<S: Stage> fmt::Debug for ExclusiveLock<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExclusiveLock")
            .field("stage", self.stage())
            .field("locked", &self.is_locked())
            .finish()
    }
}
