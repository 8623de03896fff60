/*!
 * lockkit
 * Blocking synchronization primitives for native OS threads: a lock, a
 * condition variable and a reader/writer lock, plus scoped execution helpers
 */

pub mod core;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::{SyncError, SyncResult, Violation};
pub use crate::core::guard::{with_lock, with_read, with_write, Lockable, RwLockable};
pub use crate::core::sync::{
    Condition, Lock, LockGuard, RawLock, RawRwLock, ReadGuard, ReadWriteLock, RwPolicy, RwState,
    SyncConfig, WakeResult, WriteGuard, RW_POLICY_ENV,
};
