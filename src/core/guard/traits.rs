/*!
 * Lockable Traits
 *
 * Application types expose a named lock field and get scoped execution
 * methods on themselves.
 */

use crate::core::sync::{Lock, ReadWriteLock};

/// A type guarded by a [`Lock`] it owns
pub trait Lockable {
    /// The lock guarding `self`
    fn lock(&self) -> &Lock;

    /// Run `work` with the lock held
    fn locked<F, R>(&self, work: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.lock().scoped(work)
    }
}

/// A type guarded by a [`ReadWriteLock`] it owns
pub trait RwLockable {
    /// The read/write lock guarding `self`
    fn rw_lock(&self) -> &ReadWriteLock;

    /// Run `work` with shared access
    fn read_locked<F, R>(&self, work: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.rw_lock().read_locked(work)
    }

    /// Run `work` with exclusive access
    fn write_locked<F, R>(&self, work: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.rw_lock().write_locked(work)
    }
}

impl Lockable for Lock {
    fn lock(&self) -> &Lock {
        self
    }
}

impl RwLockable for ReadWriteLock {
    fn rw_lock(&self) -> &ReadWriteLock {
        self
    }
}
