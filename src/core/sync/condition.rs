/*!
 * Condition
 *
 * Monitor-style condition variable over `parking_lot::Condvar`. A
 * `Condition` owns no lock; each wait names the [`Lock`] the caller holds,
 * releases it while asleep and holds it again before returning.
 */

use super::lock::{Lock, LockGuard};
use super::traits::WakeResult;
use crate::core::errors::{SyncError, SyncResult, Violation};
use parking_lot::Condvar;
use std::fmt;
use std::mem;
use std::time::{Duration, Instant};
use tracing::trace;

/// Condition variable used together with a [`Lock`]
///
/// Wakeups may be spurious; callers re-check their predicate in a loop (or
/// use [`Condition::wait_while`]). Signalling with nobody waiting is a no-op.
///
/// # Examples
///
/// ```
/// use lockkit::{Condition, Lock};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::thread;
///
/// let shared = Arc::new((Lock::new(), Condition::new(), AtomicBool::new(false)));
/// let remote = shared.clone();
///
/// thread::spawn(move || {
///     let (lock, ready, flag) = &*remote;
///     let _guard = lock.acquire();
///     flag.store(true, Ordering::Relaxed);
///     ready.signal();
/// });
///
/// let (lock, ready, flag) = &*shared;
/// let mut guard = lock.acquire();
/// ready.wait_while(&mut guard, || !flag.load(Ordering::Relaxed));
/// assert!(flag.load(Ordering::Relaxed));
/// ```
#[derive(Default)]
pub struct Condition {
    cv: Condvar,
}

impl Condition {
    /// Create a condition with no waiters
    pub const fn new() -> Self {
        Self { cv: Condvar::new() }
    }

    /// Release the guarded lock, sleep until signalled, then re-acquire
    ///
    /// # Panics
    ///
    /// Panics if this condition is concurrently used with a different lock.
    pub fn wait(&self, guard: &mut LockGuard<'_>) {
        let lock = guard.lock;
        lock.owner().clear();
        self.cv.wait(&mut guard.inner);
        lock.owner().claim();
    }

    /// Like [`Condition::wait`], giving up after `timeout`
    ///
    /// Returns `true` when woken by [`signal`](Condition::signal) or
    /// [`broadcast`](Condition::broadcast) and `false` when the timeout
    /// elapsed. The lock is held again in both cases. A zero timeout returns
    /// `false` at once unless a wakeup is already pending.
    pub fn wait_timeout(&self, guard: &mut LockGuard<'_>, timeout: Duration) -> bool {
        let lock = guard.lock;
        lock.owner().clear();
        let result = self.cv.wait_for(&mut guard.inner, timeout);
        lock.owner().claim();
        !result.timed_out()
    }

    /// Like [`Condition::wait`], giving up at `deadline`
    pub fn wait_until(&self, guard: &mut LockGuard<'_>, deadline: Instant) -> bool {
        let lock = guard.lock;
        lock.owner().clear();
        let result = self.cv.wait_until(&mut guard.inner, deadline);
        lock.owner().claim();
        !result.timed_out()
    }

    /// Wait while `predicate` returns true
    ///
    /// The predicate is checked before the first wait and after every wake.
    pub fn wait_while<F>(&self, guard: &mut LockGuard<'_>, mut predicate: F)
    where
        F: FnMut() -> bool,
    {
        while predicate() {
            self.wait(guard);
        }
    }

    /// Wait while `predicate` returns true, for at most `timeout` in total
    ///
    /// Returns `Err(SyncError::Timeout)` if the predicate still holds when
    /// the time is up. The lock is held on return either way.
    pub fn wait_while_for<F>(
        &self,
        guard: &mut LockGuard<'_>,
        timeout: Duration,
        mut predicate: F,
    ) -> SyncResult<()>
    where
        F: FnMut() -> bool,
    {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            // Too far out to represent: no deadline
            self.wait_while(guard, predicate);
            return Ok(());
        };

        while predicate() {
            if Instant::now() >= deadline {
                return Err(SyncError::timeout("condition", timeout));
            }
            self.wait_until(guard, deadline);
        }

        Ok(())
    }

    /// [`Condition::wait`] for a lock held through [`Lock::acquire_raw`]
    ///
    /// # Panics
    ///
    /// Panics if the calling thread does not hold `lock` through
    /// `acquire_raw`. A lock held through a [`LockGuard`] is waited on with
    /// [`Condition::wait`] instead.
    pub fn wait_raw(&self, lock: &Lock) {
        self.wait_raw_inner(lock, None);
    }

    /// [`Condition::wait_timeout`] for a lock held through [`Lock::acquire_raw`]
    ///
    /// # Panics
    ///
    /// Panics if the calling thread does not hold `lock` through
    /// `acquire_raw`.
    pub fn wait_raw_timeout(&self, lock: &Lock, timeout: Duration) -> bool {
        self.wait_raw_inner(lock, Some(timeout))
    }

    fn wait_raw_inner(&self, lock: &Lock, timeout: Option<Duration>) -> bool {
        lock.check_held_raw(Violation::WaitNotHeld, Violation::WaitGuarded);

        // SAFETY: check_held_raw proved the calling thread locked the mutex
        // and forgot its guard; this guard stands in for it and is forgotten
        // again below.
        let mut inner = unsafe { lock.raw().make_guard_unchecked() };

        lock.set_raw_held(false);
        lock.owner().clear();
        let woken = match timeout {
            Some(timeout) => !self.cv.wait_for(&mut inner, timeout).timed_out(),
            None => {
                self.cv.wait(&mut inner);
                true
            }
        };
        lock.owner().claim();
        lock.set_raw_held(true);

        mem::forget(inner);
        woken
    }

    /// Wake at most one waiting thread
    pub fn signal(&self) -> WakeResult {
        let result = WakeResult::from_count(self.cv.notify_one() as usize);
        trace!(?result, "condition signal");
        result
    }

    /// Wake every waiting thread
    pub fn broadcast(&self) -> WakeResult {
        let result = WakeResult::from_count(self.cv.notify_all());
        trace!(?result, "condition broadcast");
        result
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition").finish_non_exhaustive()
    }
}
