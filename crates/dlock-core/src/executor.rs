//! Acquire, execute, release: the scoped locking helper.

use std::future::Future;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::time::Duration;

use futures::FutureExt;
use tracing::{error, instrument};

use crate::error::{LockError, LockResult};
use crate::traits::{DistributedLock, LockFactory};

/// Bounded wait the executor spends acquiring a lock.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Lease the executor requests from the factory for its locks.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(5 * 60);

/// Runs caller-supplied work under a factory-produced lock, releasing the
/// lock on every exit path.
///
/// Nest `lock_and_execute` calls to hold several distinct resources at
/// once. Do not nest on the same key: every call obtains a fresh handle
/// from the factory, and reentrancy is tracked per handle, so an inner
/// call for a key the outer call already holds contends with it and fails
/// with [`LockError::TryLockFailed`] once the acquire timeout runs out.
/// Same-key reentrancy needs a single raw handle.
///
/// # Example
///
/// ```rust,ignore
/// let executor = LockingExecutor::new(factory);
/// let balance = executor
///     .lock_and_execute("account-7", || async { settle_account(7).await })
///     .await?;
/// ```
pub struct LockingExecutor<F> {
    factory: F,
    acquire_timeout: Duration,
    lease: Duration,
}

impl<F: LockFactory> LockingExecutor<F> {
    /// Wraps `factory` with the default 30 second acquisition bound and
    /// 5 minute lease.
    pub fn new(factory: F) -> Self {
        Self::with_timeouts(factory, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_LEASE)
    }

    /// Wraps `factory` with explicit acquisition and lease bounds.
    pub fn with_timeouts(factory: F, acquire_timeout: Duration, lease: Duration) -> Self {
        Self {
            factory,
            acquire_timeout,
            lease,
        }
    }

    /// The wrapped factory.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Acquires the lock for `key`, runs `task`, and releases the lock.
    ///
    /// # Errors
    ///
    /// * [`LockError::NotObtained`]: the factory produced no handle.
    /// * [`LockError::TryLockFailed`]: the bounded acquisition timed out.
    /// * [`LockError::Expired`]: the lease lapsed while `task` ran; the
    ///   work may have executed without protection.
    ///
    /// A panic inside `task` still releases the lock before resuming; a
    /// release failure on that path is logged rather than replacing the
    /// original panic, so both stay observable.
    #[instrument(skip(self, task), fields(lock.key = %key))]
    pub async fn lock_and_execute<T, Fut>(
        &self,
        key: &str,
        task: impl FnOnce() -> Fut,
    ) -> LockResult<T>
    where
        Fut: Future<Output = T>,
    {
        let lock = self
            .factory
            .get_lock_with_lease(key, self.lease)
            .map_err(|cause| {
                error!(key, error = %cause, "could not obtain a lock handle");
                match cause {
                    obtained @ LockError::NotObtained(_) => obtained,
                    other => LockError::NotObtained(other.to_string()),
                }
            })?;

        if !lock.try_lock_for(self.acquire_timeout).await? {
            error!(key, timeout = ?self.acquire_timeout, "timed out acquiring lock");
            return Err(LockError::TryLockFailed(key.to_string()));
        }

        match AssertUnwindSafe(task()).catch_unwind().await {
            Ok(value) => {
                // Surfaces an expired lease to the caller instead of
                // quietly returning work that may have run unprotected.
                lock.unlock().await?;
                Ok(value)
            }
            Err(panic) => {
                if let Err(release_error) = lock.unlock().await {
                    error!(key, error = %release_error, "release failed after task panicked");
                }
                resume_unwind(panic)
            }
        }
    }
}
