/*!
 * Synchronization Primitives
 *
 * Blocking building blocks for native OS threads:
 * - [`Lock`]: exclusive mutual exclusion
 * - [`Condition`]: monitor-style condition variable paired with a `Lock`
 * - [`ReadWriteLock`]: shared readers, exclusive writers, explicit fairness
 *
 * # Architecture
 *
 * `Lock` and `Condition` wrap `parking_lot` primitives and add holder
 * tracking so that misuse panics instead of corrupting state.
 * `ReadWriteLock` is composed from one `Lock` and two `Condition`s.
 *
 * # Failure model
 *
 * Precondition violations (unbalanced unlocks, waiting without the lock,
 * dropping a held primitive) panic. Timeouts are ordinary return values.
 */

mod condition;
mod config;
mod lock;
mod owner;
mod rwlock;
mod traits;

pub use condition::Condition;
pub use config::{RwPolicy, SyncConfig, RW_POLICY_ENV};
pub use lock::{Lock, LockGuard};
pub use rwlock::{ReadGuard, ReadWriteLock, RwState, WriteGuard};
pub use traits::{RawLock, RawRwLock, WakeResult};

use std::time::Duration;
use tracing::debug;

/// Log a blocking wait that took longer than `threshold`
#[inline]
pub(crate) fn note_wait(resource: &'static str, waited: Duration, threshold: Duration) {
    if waited >= threshold {
        debug!(resource, waited_us = waited.as_micros() as u64, "slow wait");
    }
}
