/*!
 * Synchronization Traits
 *
 * The raw acquire/release contract shared by the primitives and consumed by
 * the scoped execution helpers in [`crate::core::guard`].
 */

/// Result of a signal or broadcast
///
/// Compact representation (single usize) for efficient returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeResult {
    /// Successfully woke N waiters (N >= 1)
    Woken(usize),
    /// No waiters were waiting
    NoWaiters,
}

impl WakeResult {
    #[inline]
    pub(crate) fn from_count(count: usize) -> Self {
        match count {
            0 => WakeResult::NoWaiters,
            n => WakeResult::Woken(n),
        }
    }

    /// Check if any waiters were woken
    #[inline(always)]
    pub fn is_woken(&self) -> bool {
        matches!(self, WakeResult::Woken(_))
    }

    /// Get number of woken waiters (0 if none)
    #[inline(always)]
    pub fn count(&self) -> usize {
        match self {
            WakeResult::Woken(n) => *n,
            WakeResult::NoWaiters => 0,
        }
    }
}

/// An exclusive lock driven by explicit acquire/release calls
///
/// Implementations must panic when `release_raw` is called by a thread that
/// did not acquire through `acquire_raw`.
pub trait RawLock: Sync {
    /// Block until the lock is held by the calling thread
    fn acquire_raw(&self);

    /// Release a lock taken with [`RawLock::acquire_raw`]
    fn release_raw(&self);
}

/// A reader/writer lock driven by explicit lock/unlock calls
///
/// Unbalanced unlocks must panic.
pub trait RawRwLock: Sync {
    /// Block until shared access is granted
    fn lock_read(&self);

    /// Give up shared access
    fn unlock_read(&self);

    /// Block until exclusive access is granted
    fn lock_write(&self);

    /// Give up exclusive access
    fn unlock_write(&self);
}
