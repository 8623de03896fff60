/*!
 * Scoped Execution
 *
 * Run a unit of work with a lock held and release it on every exit path:
 * normal return, `Err` return and panic.
 *
 * ## Two entry points
 *
 * - **Free functions** ([`with_lock`], [`with_read`], [`with_write`]) work
 *   with anything implementing the raw [`RawLock`](crate::RawLock) /
 *   [`RawRwLock`](crate::RawRwLock) contract
 * - **Traits** ([`Lockable`], [`RwLockable`]) let an application type name
 *   its lock field once and gain `locked` / `read_locked` / `write_locked`
 *
 * ## Example
 *
 * ```rust
 * use lockkit::{Lock, Lockable};
 * use std::sync::atomic::{AtomicU64, Ordering};
 *
 * struct Account {
 *     lock: Lock,
 *     balance: AtomicU64,
 * }
 *
 * impl Lockable for Account {
 *     fn lock(&self) -> &Lock {
 *         &self.lock
 *     }
 * }
 *
 * let account = Account { lock: Lock::new(), balance: AtomicU64::new(10) };
 * account.locked(|| {
 *     let balance = account.balance.load(Ordering::Relaxed);
 *     account.balance.store(balance + 5, Ordering::Relaxed);
 * });
 * assert_eq!(account.balance.load(Ordering::Relaxed), 15);
 * ```
 */

mod scoped;
mod traits;

pub use scoped::{with_lock, with_read, with_write};
pub use traits::{Lockable, RwLockable};
