/*!
 * Scoped Helpers
 *
 * Generic over the raw lock contract; release runs from `Drop`, so it also
 * happens while a panic unwinds out of the work.
 */

use crate::core::sync::{RawLock, RawRwLock};

/// Releases on drop
struct Release<'a, L: ?Sized> {
    lock: &'a L,
    release: fn(&L),
}

impl<L: ?Sized> Drop for Release<'_, L> {
    fn drop(&mut self) {
        (self.release)(self.lock);
    }
}

/// Run `work` with `lock` held
///
/// # Examples
///
/// ```
/// use lockkit::{with_lock, Lock};
///
/// let lock = Lock::new();
/// let result: Result<(), &str> = with_lock(&lock, || Err("failed"));
/// assert!(result.is_err());
/// assert!(!lock.is_locked());
/// ```
pub fn with_lock<L, F, R>(lock: &L, work: F) -> R
where
    L: RawLock + ?Sized,
    F: FnOnce() -> R,
{
    lock.acquire_raw();
    let _release = Release {
        lock,
        release: L::release_raw,
    };
    work()
}

/// Run `work` with shared access to `lock`
pub fn with_read<L, F, R>(lock: &L, work: F) -> R
where
    L: RawRwLock + ?Sized,
    F: FnOnce() -> R,
{
    lock.lock_read();
    let _release = Release {
        lock,
        release: L::unlock_read,
    };
    work()
}

/// Run `work` with exclusive access to `lock`
pub fn with_write<L, F, R>(lock: &L, work: F) -> R
where
    L: RawRwLock + ?Sized,
    F: FnOnce() -> R,
{
    lock.lock_write();
    let _release = Release {
        lock,
        release: L::unlock_write,
    };
    work()
}
