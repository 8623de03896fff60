/*!
 * Core Module
 * Synchronization primitives, scoped execution and error handling
 */

pub mod errors;
pub mod guard;
pub mod sync;

// Re-export for convenience
pub use errors::*;
pub use guard::{with_lock, with_read, with_write, Lockable, RwLockable};
pub use sync::{
    Condition, Lock, LockGuard, RawLock, RawRwLock, ReadGuard, ReadWriteLock, RwPolicy, RwState,
    SyncConfig, WakeResult, WriteGuard,
};
