/*!
 * Read/Write Lock
 *
 * Shared readers, exclusive writers, composed from one [`Lock`] (the gate
 * protecting the counters) and two [`Condition`]s (queued readers, queued
 * writers).
 *
 * # Fairness
 *
 * - [`RwPolicy::WriterPreferred`] (default): once a writer is queued, new
 *   readers queue behind it, and a released writer hands over to the next
 *   queued writer before any queued reader. Writers cannot starve under a
 *   continuous read load. A thread that already holds a read lock may take
 *   another one without queueing, since the queued writer waits for it.
 * - [`RwPolicy::ReaderPreferred`]: readers only wait for an active writer,
 *   and writers also wait for readers that are queued. A released writer
 *   wakes all queued readers first.
 *
 * # Holder checks
 *
 * Each thread counts its own read holds per lock. Releasing a read lock the
 * thread does not hold, or asking for the write lock while holding a read
 * lock, panics.
 */

use super::condition::Condition;
use super::config::{RwPolicy, SyncConfig};
use super::lock::Lock;
use super::owner::{self, LockId, Owner};
use super::traits::RawRwLock;
use crate::core::errors::Violation;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::trace;

/// Observable state of a [`ReadWriteLock`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RwState {
    /// No readers, no writer
    Idle,
    /// `n >= 1` readers, no writer
    Reading(usize),
    /// One writer, no readers
    Writing,
}

/// Reader/writer lock
///
/// Invariants, checked under the internal gate:
/// - a writer excludes every reader and every other writer
/// - readers never block each other (except behind a queued writer under
///   writer preference)
///
/// # Examples
///
/// ```
/// use lockkit::{ReadWriteLock, RwState};
///
/// let lock = ReadWriteLock::new();
/// {
///     let _a = lock.read();
///     let _b = lock.read();
///     assert_eq!(lock.state(), RwState::Reading(2));
/// }
/// lock.write_locked(|| assert_eq!(lock.state(), RwState::Writing));
/// assert_eq!(lock.state(), RwState::Idle);
/// ```
pub struct ReadWriteLock {
    id: LockId,
    gate: Lock,
    readers_cv: Condition,
    writers_cv: Condition,
    // Counters below are only touched with `gate` held
    readers: AtomicUsize,
    writer: Owner,
    queued_readers: AtomicUsize,
    queued_writers: AtomicUsize,
    config: SyncConfig,
}

/// Shared access held until dropped
#[must_use = "the read lock is released as soon as the guard is dropped"]
pub struct ReadGuard<'a> {
    lock: &'a ReadWriteLock,
    _not_send: PhantomData<*const ()>,
}

/// Exclusive access held until dropped
#[must_use = "the write lock is released as soon as the guard is dropped"]
pub struct WriteGuard<'a> {
    lock: &'a ReadWriteLock,
    _not_send: PhantomData<*const ()>,
}

impl ReadWriteLock {
    /// Create an idle lock with writer preference
    pub const fn new() -> Self {
        Self::with_config(SyncConfig::DEFAULT)
    }

    /// Create an idle lock with the given policy
    pub const fn with_policy(policy: RwPolicy) -> Self {
        let mut config = SyncConfig::DEFAULT;
        config.rw_policy = policy;
        Self::with_config(config)
    }

    /// Create an idle lock from a full configuration
    pub const fn with_config(config: SyncConfig) -> Self {
        Self {
            id: LockId::new(),
            gate: Lock::with_slow_wait_threshold(config.slow_wait_threshold),
            readers_cv: Condition::new(),
            writers_cv: Condition::new(),
            readers: AtomicUsize::new(0),
            writer: Owner::new(),
            queued_readers: AtomicUsize::new(0),
            queued_writers: AtomicUsize::new(0),
            config,
        }
    }

    /// Fairness policy in effect
    #[inline]
    pub fn policy(&self) -> RwPolicy {
        self.config.rw_policy
    }

    /// Take shared access, blocking while a writer holds (or, under writer
    /// preference, waits for) the lock
    ///
    /// A thread that already holds a read lock is admitted at once.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread holds the write lock.
    pub fn lock_read(&self) {
        let id = self.id.get();
        let mut gate = self.gate.acquire();
        if self.writer.is_current() {
            Violation::Reentrant.raise();
        }

        if owner::read_holds(id) == 0 && self.read_blocked() {
            trace!(policy = ?self.policy(), "read lock contended");
            let start = Instant::now();
            bump(&self.queued_readers);
            while self.read_blocked() {
                self.readers_cv.wait(&mut gate);
            }
            drop_one(&self.queued_readers);
            super::note_wait("read lock", start.elapsed(), self.config.slow_wait_threshold);
        }

        bump(&self.readers);
        owner::add_read_hold(id);
    }

    /// Give up shared access
    ///
    /// The last reader out wakes one queued writer.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread holds no read lock on `self`.
    pub fn unlock_read(&self) {
        let id = self.id.get();
        let _gate = self.gate.acquire();

        if !owner::remove_read_hold(id) {
            Violation::UnlockReadNotHeld.raise();
        }
        let readers = self.readers.load(Ordering::Relaxed);
        debug_assert!(readers > 0, "read hold recorded without a reader");
        self.readers.store(readers - 1, Ordering::Relaxed);

        if readers == 1 && self.queued_writers.load(Ordering::Relaxed) > 0 {
            self.writers_cv.signal();
        }
    }

    /// Take exclusive access, blocking until there are no readers and no
    /// writer
    ///
    /// # Panics
    ///
    /// Panics if the calling thread already holds the write lock or a read
    /// lock.
    pub fn lock_write(&self) {
        let id = self.id.get();
        let mut gate = self.gate.acquire();
        if self.writer.is_current() || owner::read_holds(id) > 0 {
            Violation::Reentrant.raise();
        }

        if self.write_blocked() {
            trace!(policy = ?self.policy(), "write lock contended");
            let start = Instant::now();
            bump(&self.queued_writers);
            while self.write_blocked() {
                self.writers_cv.wait(&mut gate);
            }
            drop_one(&self.queued_writers);
            super::note_wait("write lock", start.elapsed(), self.config.slow_wait_threshold);
        }

        self.writer.claim();
    }

    /// Give up exclusive access and hand over according to the policy
    ///
    /// # Panics
    ///
    /// Panics if the calling thread is not the active writer.
    pub fn unlock_write(&self) {
        let _gate = self.gate.acquire();

        if !self.writer.is_current() {
            Violation::UnlockWriteNotHeld.raise();
        }
        self.writer.clear();

        let queued_readers = self.queued_readers.load(Ordering::Relaxed);
        let queued_writers = self.queued_writers.load(Ordering::Relaxed);

        match self.policy() {
            RwPolicy::WriterPreferred => {
                if queued_writers > 0 {
                    self.writers_cv.signal();
                } else if queued_readers > 0 {
                    self.readers_cv.broadcast();
                }
            }
            RwPolicy::ReaderPreferred => {
                if queued_readers > 0 {
                    self.readers_cv.broadcast();
                } else if queued_writers > 0 {
                    self.writers_cv.signal();
                }
            }
        }
    }

    /// Shared access as a guard
    pub fn read(&self) -> ReadGuard<'_> {
        self.lock_read();
        ReadGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Exclusive access as a guard
    pub fn write(&self) -> WriteGuard<'_> {
        self.lock_write();
        WriteGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Shared access if it is available without waiting
    pub fn try_read(&self) -> Option<ReadGuard<'_>> {
        let id = self.id.get();
        let _gate = self.gate.acquire();
        if self.writer.is_current() {
            Violation::Reentrant.raise();
        }
        if owner::read_holds(id) == 0 && self.read_blocked() {
            return None;
        }

        bump(&self.readers);
        owner::add_read_hold(id);
        Some(ReadGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Exclusive access if it is available without waiting
    pub fn try_write(&self) -> Option<WriteGuard<'_>> {
        let _gate = self.gate.acquire();
        if self.writer.is_current() {
            Violation::Reentrant.raise();
        }
        if self.write_blocked() {
            return None;
        }

        self.writer.claim();
        Some(WriteGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Run `work` with shared access, releasing on every exit path
    pub fn read_locked<F, R>(&self, work: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.read();
        work()
    }

    /// Run `work` with exclusive access, releasing on every exit path
    pub fn write_locked<F, R>(&self, work: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.write();
        work()
    }

    /// Current state snapshot
    pub fn state(&self) -> RwState {
        self.gate.scoped(|| self.state_locked())
    }

    /// Number of active readers
    pub fn reader_count(&self) -> usize {
        self.gate.scoped(|| self.readers.load(Ordering::Relaxed))
    }

    /// Whether a writer holds the lock
    pub fn is_write_locked(&self) -> bool {
        self.gate.scoped(|| self.writer.is_held())
    }

    /// Number of threads queued for read and for write access
    pub fn queued(&self) -> (usize, usize) {
        self.gate.scoped(|| {
            (
                self.queued_readers.load(Ordering::Relaxed),
                self.queued_writers.load(Ordering::Relaxed),
            )
        })
    }

    fn state_locked(&self) -> RwState {
        let readers = self.readers.load(Ordering::Relaxed);
        match (self.writer.is_held(), readers) {
            (true, _) => {
                debug_assert_eq!(readers, 0, "writer active alongside readers");
                RwState::Writing
            }
            (false, 0) => RwState::Idle,
            (false, n) => RwState::Reading(n),
        }
    }

    fn read_blocked(&self) -> bool {
        if self.writer.is_held() {
            return true;
        }
        self.policy() == RwPolicy::WriterPreferred
            && self.queued_writers.load(Ordering::Relaxed) > 0
    }

    fn write_blocked(&self) -> bool {
        if self.writer.is_held() || self.readers.load(Ordering::Relaxed) > 0 {
            return true;
        }
        self.policy() == RwPolicy::ReaderPreferred
            && self.queued_readers.load(Ordering::Relaxed) > 0
    }
}

// Plain load/store: every counter update happens with the gate held.
#[inline]
fn bump(counter: &AtomicUsize) {
    counter.store(counter.load(Ordering::Relaxed) + 1, Ordering::Relaxed);
}

#[inline]
fn drop_one(counter: &AtomicUsize) {
    counter.store(counter.load(Ordering::Relaxed) - 1, Ordering::Relaxed);
}

impl Default for ReadWriteLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReadWriteLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadWriteLock")
            .field("state", &self.state())
            .field("policy", &self.policy())
            .finish()
    }
}

impl Drop for ReadWriteLock {
    fn drop(&mut self) {
        let held = self.writer.is_held() || *self.readers.get_mut() > 0;
        if held && !std::thread::panicking() {
            Violation::DroppedWhileHeld("read/write lock").raise();
        }
    }
}

impl RawRwLock for ReadWriteLock {
    fn lock_read(&self) {
        ReadWriteLock::lock_read(self)
    }

    fn unlock_read(&self) {
        ReadWriteLock::unlock_read(self)
    }

    fn lock_write(&self) {
        ReadWriteLock::lock_write(self)
    }

    fn unlock_write(&self) {
        ReadWriteLock::unlock_write(self)
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock_read();
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock_write();
    }
}

impl fmt::Debug for ReadGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadGuard").finish_non_exhaustive()
    }
}

impl fmt::Debug for WriteGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn wait_for_queued_writer(lock: &ReadWriteLock) {
        while lock.queued().1 == 0 {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_state_transitions() {
        let lock = ReadWriteLock::new();
        assert_eq!(lock.state(), RwState::Idle);

        lock.lock_read();
        lock.lock_read();
        assert_eq!(lock.state(), RwState::Reading(2));
        lock.unlock_read();
        assert_eq!(lock.state(), RwState::Reading(1));
        lock.unlock_read();
        assert_eq!(lock.state(), RwState::Idle);

        lock.lock_write();
        assert_eq!(lock.state(), RwState::Writing);
        assert!(lock.is_write_locked());
        lock.unlock_write();
        assert_eq!(lock.state(), RwState::Idle);
    }

    #[test]
    fn test_try_variants() {
        let lock = ReadWriteLock::new();

        let read = lock.try_read().expect("idle lock grants read");
        assert!(lock.try_read().is_some());
        assert!(lock.try_write().is_none());
        drop(read);

        let write = lock.try_write().expect("idle lock grants write");
        let blocked = thread::scope(|s| s.spawn(|| lock.try_read().is_none()).join().unwrap());
        assert!(blocked);
        drop(write);

        assert_eq!(lock.state(), RwState::Idle);
    }

    #[test]
    #[should_panic(expected = "read lock released while no reader holds it")]
    fn test_unbalanced_unlock_read_panics() {
        ReadWriteLock::new().unlock_read();
    }

    #[test]
    #[should_panic(expected = "write lock released by a thread that is not the writer")]
    fn test_unbalanced_unlock_write_panics() {
        ReadWriteLock::new().unlock_write();
    }

    #[test]
    fn test_unlock_write_from_other_thread_panics() {
        let lock = Arc::new(ReadWriteLock::new());
        lock.lock_write();

        let lock_clone = lock.clone();
        assert!(thread::spawn(move || lock_clone.unlock_write()).join().is_err());

        assert!(lock.is_write_locked());
        lock.unlock_write();
    }

    #[test]
    fn test_unlock_read_from_other_thread_panics() {
        let lock = Arc::new(ReadWriteLock::new());
        lock.lock_read();

        let lock_clone = lock.clone();
        assert!(thread::spawn(move || lock_clone.unlock_read()).join().is_err());

        // The real reader is still counted, so writers stay out
        assert_eq!(lock.state(), RwState::Reading(1));
        let lock_clone = lock.clone();
        let writer_refused =
            thread::spawn(move || lock_clone.try_write().is_none()).join().unwrap();
        assert!(writer_refused);

        lock.unlock_read();
        assert_eq!(lock.state(), RwState::Idle);
    }

    #[test]
    fn test_read_holds_are_per_lock() {
        let first = ReadWriteLock::new();
        let second = ReadWriteLock::new();
        let _read = first.read();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            second.unlock_read();
        }));
        assert!(result.is_err());
        assert_eq!(first.state(), RwState::Reading(1));
        assert_eq!(second.state(), RwState::Idle);
    }

    #[test]
    #[should_panic(expected = "lock acquired again by the thread already holding it")]
    fn test_write_while_reading_same_thread_panics() {
        let lock = ReadWriteLock::new();
        let _read = lock.read();
        lock.lock_write();
    }

    #[test]
    fn test_nested_read_passes_queued_writer() {
        let lock = Arc::new(ReadWriteLock::new());
        let outer = lock.read();

        let lock_clone = lock.clone();
        let writer = thread::spawn(move || lock_clone.write_locked(|| ()));
        wait_for_queued_writer(&lock);

        // Would deadlock if the nested read queued behind the writer
        let inner = lock.read();
        assert_eq!(lock.state(), RwState::Reading(2));

        drop(inner);
        drop(outer);
        writer.join().unwrap();
        assert_eq!(lock.state(), RwState::Idle);
    }

    #[test]
    #[should_panic(expected = "lock acquired again by the thread already holding it")]
    fn test_write_then_read_same_thread_panics() {
        let lock = ReadWriteLock::new();
        let _write = lock.write();
        lock.lock_read();
    }

    #[test]
    fn test_writer_waits_for_readers() {
        let lock = Arc::new(ReadWriteLock::new());
        let read = lock.read();

        let lock_clone = lock.clone();
        let writer = thread::spawn(move || lock_clone.write_locked(|| lock_clone.state()));

        wait_for_queued_writer(&lock);
        assert_eq!(lock.queued(), (0, 1));
        drop(read);

        assert_eq!(writer.join().unwrap(), RwState::Writing);
        assert_eq!(lock.state(), RwState::Idle);
    }

    #[test]
    fn test_writer_preference_blocks_new_readers() {
        let lock = Arc::new(ReadWriteLock::new());
        let read = lock.read();

        let lock_clone = lock.clone();
        let writer = thread::spawn(move || lock_clone.write_locked(|| ()));

        wait_for_queued_writer(&lock);
        // A writer is queued, so a fresh reader is refused
        let refused = thread::scope(|s| s.spawn(|| lock.try_read().is_none()).join().unwrap());
        assert!(refused);

        drop(read);
        writer.join().unwrap();
    }

    #[test]
    fn test_reader_preference_admits_new_readers() {
        let lock = Arc::new(ReadWriteLock::with_policy(RwPolicy::ReaderPreferred));
        let read = lock.read();

        let lock_clone = lock.clone();
        let writer = thread::spawn(move || lock_clone.write_locked(|| ()));

        wait_for_queued_writer(&lock);
        let admitted = thread::scope(|s| {
            s.spawn(|| lock.try_read().map(drop).is_some())
                .join()
                .unwrap()
        });
        assert!(admitted);

        drop(read);
        writer.join().unwrap();
    }
}
