/*!
 * Scoped Execution Tests
 *
 * Locks are free again as soon as the unit of work returns, fails or panics
 */

use lockkit::{with_lock, with_read, with_write, Lock, Lockable, ReadWriteLock, RwLockable};
use pretty_assertions::assert_eq;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Application type holding its lock as a named field
struct Counter {
    lock: Lock,
    value: AtomicU64,
}

impl Lockable for Counter {
    fn lock(&self) -> &Lock {
        &self.lock
    }
}

/// Application type holding a read/write lock
struct Settings {
    rw: ReadWriteLock,
    revision: AtomicU64,
}

impl RwLockable for Settings {
    fn rw_lock(&self) -> &ReadWriteLock {
        &self.rw
    }
}

fn acquired_elsewhere(lock: &Arc<Lock>) -> bool {
    let lock = lock.clone();
    thread::spawn(move || lock.try_acquire_for(Duration::from_millis(100)).is_ok())
        .join()
        .unwrap()
}

#[test]
fn test_error_exit_releases_lock() {
    let lock = Arc::new(Lock::new());

    let result: Result<(), String> = lock.scoped(|| Err("validation failed".into()));

    assert_eq!(result, Err("validation failed".to_string()));
    assert!(!lock.is_locked());
    assert!(acquired_elsewhere(&lock));
}

#[test]
fn test_panic_exit_releases_lock() {
    let lock = Arc::new(Lock::new());

    let result = catch_unwind(AssertUnwindSafe(|| {
        with_lock(&*lock, || panic!("work panicked"));
    }));

    assert!(result.is_err());
    assert!(acquired_elsewhere(&lock));
}

#[test]
fn test_panic_exit_releases_rw_lock() {
    let lock = ReadWriteLock::new();

    let read = catch_unwind(AssertUnwindSafe(|| with_read(&lock, || panic!("reader"))));
    let write = catch_unwind(AssertUnwindSafe(|| with_write(&lock, || panic!("writer"))));

    assert!(read.is_err());
    assert!(write.is_err());
    assert!(lock.try_write().is_some());
}

#[test]
fn test_lockable_counter_is_exact() {
    let counter = Arc::new(Counter {
        lock: Lock::new(),
        value: AtomicU64::new(0),
    });

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..1_000 {
                    counter.locked(|| {
                        let seen = counter.value.load(Ordering::Relaxed);
                        counter.value.store(seen + 1, Ordering::Relaxed);
                    });
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(counter.value.load(Ordering::Relaxed), 4_000);
}

#[test]
fn test_rw_lockable_settings() {
    let settings = Arc::new(Settings {
        rw: ReadWriteLock::new(),
        revision: AtomicU64::new(0),
    });

    let writers: Vec<_> = (0..2)
        .map(|_| {
            let settings = settings.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    settings.write_locked(|| {
                        let seen = settings.revision.load(Ordering::Relaxed);
                        settings.revision.store(seen + 1, Ordering::Relaxed);
                    });
                }
            })
        })
        .collect();

    let reader = {
        let settings = settings.clone();
        thread::spawn(move || {
            let mut last = 0;
            for _ in 0..500 {
                let now = settings.read_locked(|| settings.revision.load(Ordering::Relaxed));
                assert!(now >= last);
                last = now;
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(settings.read_locked(|| settings.revision.load(Ordering::Relaxed)), 1_000);
}
