/*!
 * Error Types
 * Recoverable sync errors with thiserror and miette, plus the precondition
 * violations that abort the calling thread with a panic
 */

use miette::Diagnostic;
use std::time::Duration;
use thiserror::Error;

/// Result type for the bounded and non-blocking sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Recoverable outcomes of bounded waits
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SyncError {
    #[error("{resource} not acquired within {waited:?}")]
    #[diagnostic(
        code(sync::timeout),
        help("Another thread kept the resource busy. Retry or raise the timeout.")
    )]
    Timeout {
        resource: &'static str,
        waited: Duration,
    },
}

impl SyncError {
    #[inline]
    pub(crate) fn timeout(resource: &'static str, waited: Duration) -> Self {
        Self::Timeout { resource, waited }
    }

    /// Check if this error is a timeout
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Programmer errors that are never recovered from
///
/// Each variant is raised with [`Violation::raise`], which logs the violation
/// and panics with its message. Tolerating these would hide real races.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    #[error("lock released by a thread that does not hold it")]
    ReleaseNotHeld,

    #[error("lock held through a guard was released raw")]
    ReleaseGuarded,

    #[error("lock acquired again by the thread already holding it")]
    Reentrant,

    #[error("condition waited on without holding the lock")]
    WaitNotHeld,

    #[error("raw condition wait on a lock held through a guard")]
    WaitGuarded,

    #[error("read lock released while no reader holds it")]
    UnlockReadNotHeld,

    #[error("write lock released by a thread that is not the writer")]
    UnlockWriteNotHeld,

    #[error("{0} dropped while still held")]
    DroppedWhileHeld(&'static str),
}

impl Violation {
    /// Log and panic
    #[cold]
    #[inline(never)]
    #[track_caller]
    pub(crate) fn raise(self) -> ! {
        tracing::error!(violation = ?self, "synchronization precondition violated");
        panic!("{}", self)
    }
}
