/*!
 * Owner Tokens
 *
 * Every thread gets a small nonzero token on first use. Primitives record the
 * token of their holder so that misuse (releasing a lock held elsewhere,
 * waiting without the lock) is caught instead of corrupting state.
 *
 * Shared holds cannot live in a single slot, so each thread also keeps its
 * own count of read holds per reader/writer lock, keyed by [`LockId`].
 */

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

const NO_OWNER: usize = 0;

static NEXT_TOKEN: AtomicUsize = AtomicUsize::new(1);
static NEXT_LOCK_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static TOKEN: usize = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
    static READ_HOLDS: RefCell<HashMap<usize, usize>> = RefCell::new(HashMap::new());
}

/// Token of the calling thread
#[inline]
pub(crate) fn current() -> usize {
    TOKEN.with(|token| *token)
}

/// Holder slot of a primitive
///
/// Only the holder writes the slot while it holds the primitive, so relaxed
/// ordering is enough; the primitive's own lock orders everything else.
#[derive(Debug)]
pub(crate) struct Owner(AtomicUsize);

impl Owner {
    pub(crate) const fn new() -> Self {
        Self(AtomicUsize::new(NO_OWNER))
    }

    #[inline]
    pub(crate) fn claim(&self) {
        self.0.store(current(), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn clear(&self) {
        self.0.store(NO_OWNER, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn is_current(&self) -> bool {
        self.0.load(Ordering::Relaxed) == current()
    }

    #[inline]
    pub(crate) fn is_held(&self) -> bool {
        self.0.load(Ordering::Relaxed) != NO_OWNER
    }
}

/// Identity of a primitive, stable across moves
///
/// Assigned lazily so constructors stay `const`.
#[derive(Debug)]
pub(crate) struct LockId(AtomicUsize);

impl LockId {
    pub(crate) const fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    pub(crate) fn get(&self) -> usize {
        let id = self.0.load(Ordering::Relaxed);
        if id != 0 {
            return id;
        }

        let fresh = NEXT_LOCK_ID.fetch_add(1, Ordering::Relaxed);
        match self
            .0
            .compare_exchange(0, fresh, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => fresh,
            Err(existing) => existing,
        }
    }
}

/// Read holds the calling thread has on lock `id`
#[inline]
pub(crate) fn read_holds(id: usize) -> usize {
    READ_HOLDS.with(|holds| holds.borrow().get(&id).copied().unwrap_or(0))
}

/// Record one more read hold on lock `id` for the calling thread
pub(crate) fn add_read_hold(id: usize) {
    READ_HOLDS.with(|holds| *holds.borrow_mut().entry(id).or_insert(0) += 1);
}

/// Drop one read hold on lock `id`, returning `false` if the calling thread
/// had none
pub(crate) fn remove_read_hold(id: usize) -> bool {
    READ_HOLDS.with(|holds| {
        let mut holds = holds.borrow_mut();
        match holds.get_mut(&id) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                holds.remove(&id);
                true
            }
            None => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_tokens_differ_per_thread() {
        let here = current();
        let there = thread::spawn(current).join().unwrap();
        assert_ne!(here, NO_OWNER);
        assert_ne!(here, there);
        assert_eq!(here, current());
    }

    #[test]
    fn test_claim_and_clear() {
        let owner = Owner::new();
        assert!(!owner.is_held());

        owner.claim();
        assert!(owner.is_held());
        assert!(owner.is_current());

        let seen_elsewhere = thread::scope(|s| s.spawn(|| owner.is_current()).join().unwrap());
        assert!(!seen_elsewhere);

        owner.clear();
        assert!(!owner.is_held());
    }

    #[test]
    fn test_read_holds_are_per_thread() {
        let id = LockId::new();
        let key = id.get();
        assert_eq!(key, id.get());

        add_read_hold(key);
        add_read_hold(key);
        assert_eq!(read_holds(key), 2);

        let elsewhere = thread::spawn(move || (read_holds(key), remove_read_hold(key)))
            .join()
            .unwrap();
        assert_eq!(elsewhere, (0, false));

        assert!(remove_read_hold(key));
        assert!(remove_read_hold(key));
        assert!(!remove_read_hold(key));
        assert_eq!(read_holds(key), 0);
    }

    #[test]
    fn test_lock_ids_differ() {
        assert_ne!(LockId::new().get(), LockId::new().get());
    }
}
