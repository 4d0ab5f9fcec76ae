//! Error types for distributed lock operations.

use thiserror::Error;

/// Errors that can occur during lock operations.
///
/// Running out the acquisition timeout is not an error: `try_lock` returns
/// `Ok(false)` and the caller decides whether to retry, fail, or escalate.
#[derive(Error, Debug)]
pub enum LockError {
    /// The ownership check failed at release time: the lease expired (and
    /// possibly another holder took over) while the critical section was
    /// still running. The protected code may have executed, partially or
    /// fully, without exclusive protection.
    #[error("lock expired before release; the critical section may have run unprotected")]
    Expired,

    /// The factory could not construct a lock handle at all.
    #[error("no lock could be obtained: {0}")]
    NotObtained(String),

    /// The locking executor's own bounded acquisition attempt timed out.
    ///
    /// Distinct from a raw `try_lock` returning `false`: callers of the
    /// executor get an error-based contract, callers of raw handles get a
    /// boolean one.
    #[error("failed to acquire lock for key '{0}' within the executor timeout")]
    TryLockFailed(String),

    /// Invalid lock name.
    #[error("invalid lock name: {0}")]
    InvalidName(String),

    /// Backend-specific error. Store and network failures propagate as-is,
    /// never masked as lock-protocol outcomes.
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LockError {
    /// Wraps an arbitrary store or client error.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        LockError::Backend(Box::new(err))
    }
}

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;
