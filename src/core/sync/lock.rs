/*!
 * Lock
 *
 * Exclusive mutual exclusion over a native parking mutex. Ownership is
 * expressed two ways:
 * - [`LockGuard`], returned by [`Lock::acquire`], releases on drop and is the
 *   token [`Condition::wait`](super::Condition::wait) takes
 * - the raw pair [`Lock::acquire_raw`] / [`Lock::release_raw`], checked
 *   against the calling thread at release time
 */

use super::config::SyncConfig;
use super::owner::Owner;
use super::traits::RawLock;
use crate::core::errors::{SyncError, SyncResult, Violation};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

/// Mutual exclusion lock
///
/// At most one thread holds a `Lock` at any instant. The lock is not
/// reentrant: acquiring it again from the holding thread panics rather than
/// deadlocking.
///
/// # Examples
///
/// ```
/// use lockkit::Lock;
///
/// let lock = Lock::new();
/// let answer = lock.scoped(|| 6 * 7);
/// assert_eq!(answer, 42);
/// assert!(!lock.is_locked());
/// ```
pub struct Lock {
    raw: Mutex<()>,
    owner: Owner,
    /// Held through `acquire_raw` rather than a guard
    raw_held: AtomicBool,
    slow_wait: Duration,
}

/// Proof that the current thread holds a [`Lock`]
///
/// Dropping the guard releases the lock. Guards are not `Send`: a lock is
/// released by the thread that acquired it.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    pub(crate) lock: &'a Lock,
    pub(crate) inner: MutexGuard<'a, ()>,
}

impl Lock {
    /// Create an unlocked lock
    pub const fn new() -> Self {
        Self::with_slow_wait_threshold(SyncConfig::DEFAULT.slow_wait_threshold)
    }

    /// Create an unlocked lock that logs contended waits longer than
    /// `threshold`
    pub const fn with_slow_wait_threshold(threshold: Duration) -> Self {
        Self {
            raw: Mutex::new(()),
            owner: Owner::new(),
            raw_held: AtomicBool::new(false),
            slow_wait: threshold,
        }
    }

    /// Block until the lock is free, then hold it
    ///
    /// # Panics
    ///
    /// Panics if the calling thread already holds the lock.
    pub fn acquire(&self) -> LockGuard<'_> {
        self.check_not_reentrant();

        let inner = match self.raw.try_lock() {
            Some(inner) => inner,
            None => self.acquire_contended(),
        };

        self.owner.claim();
        LockGuard { lock: self, inner }
    }

    #[cold]
    fn acquire_contended(&self) -> MutexGuard<'_, ()> {
        trace!("lock contended, parking");
        let start = Instant::now();
        let inner = self.raw.lock();
        super::note_wait("lock", start.elapsed(), self.slow_wait);
        inner
    }

    /// Hold the lock if it is free right now
    pub fn try_acquire(&self) -> Option<LockGuard<'_>> {
        self.check_not_reentrant();

        let inner = self.raw.try_lock()?;
        self.owner.claim();
        Some(LockGuard { lock: self, inner })
    }

    /// Block for at most `timeout` waiting for the lock
    pub fn try_acquire_for(&self, timeout: Duration) -> SyncResult<LockGuard<'_>> {
        self.check_not_reentrant();

        let inner = self
            .raw
            .try_lock_for(timeout)
            .ok_or_else(|| SyncError::timeout("lock", timeout))?;
        self.owner.claim();
        Ok(LockGuard { lock: self, inner })
    }

    /// Acquire without a guard
    ///
    /// Pair every call with [`Lock::release_raw`] on the same thread.
    pub fn acquire_raw(&self) {
        mem::forget(self.acquire());
        self.raw_held.store(true, Ordering::Relaxed);
    }

    /// Release a lock taken with [`Lock::acquire_raw`]
    ///
    /// Wakes at most one blocked acquirer.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread does not hold the lock, or holds it
    /// through a [`LockGuard`].
    pub fn release_raw(&self) {
        self.check_held_raw(Violation::ReleaseNotHeld, Violation::ReleaseGuarded);

        self.raw_held.store(false, Ordering::Relaxed);
        self.owner.clear();
        // SAFETY: check_held_raw proved this thread locked `raw` in
        // acquire_raw and forgot the guard.
        unsafe { self.raw.force_unlock() };
    }

    /// Run `work` with the lock held
    ///
    /// The lock is released on every exit path. A panic inside `work` is
    /// propagated after the release; a `Result` is returned unchanged.
    pub fn scoped<F, R>(&self, work: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.acquire();
        work()
    }

    /// Whether any thread holds the lock
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// Whether the calling thread holds the lock
    #[inline]
    pub fn is_held_by_current_thread(&self) -> bool {
        self.raw.is_locked() && self.owner.is_current()
    }

    #[inline]
    fn check_not_reentrant(&self) {
        if self.is_held_by_current_thread() {
            Violation::Reentrant.raise();
        }
    }

    /// Panic unless the caller holds the lock via `acquire_raw`
    ///
    /// `not_held` is raised when the caller does not hold the lock at all,
    /// `guarded` when it holds it through a [`LockGuard`].
    #[inline]
    pub(crate) fn check_held_raw(&self, not_held: Violation, guarded: Violation) {
        if !self.is_held_by_current_thread() {
            not_held.raise();
        }
        if !self.raw_held.load(Ordering::Relaxed) {
            guarded.raise();
        }
    }

    pub(crate) fn raw(&self) -> &Mutex<()> {
        &self.raw
    }

    pub(crate) fn owner(&self) -> &Owner {
        &self.owner
    }

    pub(crate) fn set_raw_held(&self, held: bool) {
        self.raw_held.store(held, Ordering::Relaxed);
    }
}

impl Default for Lock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("locked", &self.is_locked())
            .finish()
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        if self.raw.is_locked() && !std::thread::panicking() {
            Violation::DroppedWhileHeld("lock").raise();
        }
    }
}

impl RawLock for Lock {
    fn acquire_raw(&self) {
        Lock::acquire_raw(self)
    }

    fn release_raw(&self) {
        Lock::release_raw(self)
    }
}

impl<'a> LockGuard<'a> {
    /// The lock this guard holds
    #[inline]
    pub fn lock(&self) -> &'a Lock {
        self.lock
    }

    /// Release the lock now
    #[inline]
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        // Cleared before `inner` unlocks so a new holder's claim survives
        self.lock.owner.clear();
    }
}

impl fmt::Debug for LockGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard").finish_non_exhaustive()
    }
}
