//! Core traits for distributed locks.

use std::future::Future;
use std::time::Duration;

use crate::error::LockResult;
use crate::timeout::DEFAULT_TRY_LOCK_TIMEOUT;

// ============================================================================
// Distributed Lock Trait
// ============================================================================

/// A distributed mutual exclusion lock over a named resource.
///
/// One instance guards one fully-qualified key and is driven by a single
/// logical execution context; contending callers each construct their own
/// instance for the same key, whether they live in the same process or not.
///
/// All acquisition paths occupy the calling task until they resolve: the
/// timeout bounds the surrounding retry loop, never an in-flight store call.
///
/// # Example
///
/// ```rust,ignore
/// let lock = factory.get_lock("order-42")?;
/// if lock.try_lock_for(Duration::from_secs(5)).await? {
///     // Critical section - we have exclusive access
///     process_order().await;
///     lock.unlock().await?;
/// }
/// ```
pub trait DistributedLock: Send + Sync {
    /// Fully-qualified key identifying the contended resource.
    fn key(&self) -> &str;

    /// Acquires the lock, repeating bounded attempts until one succeeds.
    fn lock(&self) -> impl Future<Output = LockResult<()>> + Send {
        async move {
            loop {
                if self.try_lock().await? {
                    return Ok(());
                }
                tracing::debug!(key = %self.key(), "retrying lock acquisition");
            }
        }
    }

    /// Single bounded acquisition attempt with the default 30 second wait.
    fn try_lock(&self) -> impl Future<Output = LockResult<bool>> + Send {
        self.try_lock_for(DEFAULT_TRY_LOCK_TIMEOUT)
    }

    /// Attempts to acquire the lock, waiting up to `timeout`.
    ///
    /// Returns `Ok(false)` when the deadline elapses without an acquisition,
    /// an expected outcome rather than an error. A context that already holds this
    /// key succeeds immediately without contacting the store.
    fn try_lock_for(&self, timeout: Duration) -> impl Future<Output = LockResult<bool>> + Send;

    /// Releases the lock.
    ///
    /// A nested release (the context still holds the key after this exit)
    /// leaves the store untouched; the last balanced release performs the
    /// store-side release. Backends with an ownership check surface
    /// [`LockError::Expired`] when that check fails.
    ///
    /// [`LockError::Expired`]: crate::error::LockError::Expired
    fn unlock(&self) -> impl Future<Output = LockResult<()>> + Send;
}

// ============================================================================
// Lock Factory Trait
// ============================================================================

/// Factory producing lock handles by resource name.
///
/// Factories encapsulate backend selection, key namespacing, and the store
/// clients locks are bound to, letting application code stay
/// backend-agnostic.
///
/// # Example
///
/// ```rust,ignore
/// let lock = factory.get_lock_with_lease("report", Duration::from_secs(60))?;
/// lock.lock().await?;
/// generate_report().await;
/// lock.unlock().await?;
/// ```
pub trait LockFactory: Send + Sync {
    /// The lock type produced by this factory.
    type Lock: DistributedLock;

    /// Builds a lock handle for `name` with the factory's default lease.
    fn get_lock(&self, name: &str) -> LockResult<Self::Lock>;

    /// Builds a lock handle for `name` with an explicit lease duration.
    fn get_lock_with_lease(&self, name: &str, lease: Duration) -> LockResult<Self::Lock>;
}
