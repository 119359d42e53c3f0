use std::time::{Duration, Instant};

/// When a blocking acquisition gives up.
///
/// A single `Deadline` is computed at the start of each public locking call
/// and shared by every wait that call performs internally, so retrying after a
/// spurious wakeup (or after losing a race) never extends the caller's bound.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Deadline {
    /// Wait as long as it takes.
    Never,
    /// Don't wait at all.
    Now,
    /// Wait until this instant.
    At(Instant),
}

impl Deadline {
    /// Converts a caller-provided timeout into a deadline.
    ///
    /// `None` never expires, a zero duration is a non-blocking probe, and a
    /// duration too large to represent as an `Instant` is treated as `None`.
    pub(crate) fn after(timeout: Option<Duration>) -> Self {
        match timeout {
            None => Self::Never,
            Some(timeout) if timeout.is_zero() => Self::Now,
            Some(timeout) => Instant::now()
                .checked_add(timeout)
                .map_or(Self::Never, Self::At),
        }
    }

    /// Returns how long a wait may still block.
    ///
    /// - `None` means "block indefinitely".
    /// - `Some(Duration::ZERO)` means the deadline has passed.
    pub(crate) fn remaining(&self) -> Option<Duration> {
        match self {
            Self::Never => None,
            Self::Now => Some(Duration::ZERO),
            Self::At(at) => Some(at.saturating_duration_since(Instant::now())),
        }
    }
}
