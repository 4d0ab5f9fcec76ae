//! Lease-based store lock with an owner token.

use std::sync::Arc;
use std::time::Duration;

use tracing::{Span, instrument};
use uuid::Uuid;

use crate::error::{LockError, LockResult};
use crate::reentrancy::ReentrancyRegistry;
use crate::store::KeyValueStore;
use crate::timeout::Deadline;
use crate::traits::DistributedLock;

/// Store lock backed by one atomic set-if-absent-with-expiry command.
///
/// The value written is an owner token generated once per handle, and
/// release is a token-checked atomic delete, so only the handle that wrote
/// the key can remove it. The lease bounds how long a crashed holder blocks
/// everyone else, but it cuts both ways: a lease shorter than the critical
/// section leaves the tail of that section unprotected, while a generous
/// lease extends unavailability after a crash.
pub struct LeaseLock {
    store: Arc<dyn KeyValueStore>,
    key: String,
    token: String,
    lease: Duration,
    registry: ReentrancyRegistry,
}

impl LeaseLock {
    /// Creates a handle for `key` against `store`, minting a fresh owner
    /// token.
    pub fn new(store: Arc<dyn KeyValueStore>, key: String, lease: Duration) -> Self {
        Self {
            store,
            key,
            token: Uuid::new_v4().to_string(),
            lease,
            registry: ReentrancyRegistry::new(),
        }
    }

    /// Owner token this handle writes into the store while holding the lock.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Lease applied to every acquisition by this handle.
    pub fn lease(&self) -> Duration {
        self.lease
    }

    /// One conditional-set attempt, no retries.
    pub(crate) async fn try_set(&self) -> LockResult<bool> {
        self.store.set_nx_px(&self.key, &self.token, self.lease).await
    }

    /// Token-checked delete; `false` means the token no longer matched.
    pub(crate) async fn clean(&self) -> LockResult<bool> {
        self.store.delete_eq(&self.key, &self.token).await
    }
}

impl DistributedLock for LeaseLock {
    fn key(&self) -> &str {
        &self.key
    }

    #[instrument(skip(self), fields(lock.key = %self.key, backend = "lease", timeout = ?timeout))]
    async fn try_lock_for(&self, timeout: Duration) -> LockResult<bool> {
        if self.registry.is_entered(&self.key) {
            Span::current().record("reentrant", true);
            self.registry.enter(&self.key);
            return Ok(true);
        }

        let deadline = Deadline::after(timeout);
        loop {
            if self.try_set().await? {
                tracing::info!(key = %self.key, "locked by conditional set");
                self.registry.enter(&self.key);
                return Ok(true);
            }
            match deadline.poll_sleep() {
                Some(sleep) => tokio::time::sleep(sleep).await,
                None => {
                    Span::current().record("acquired", false);
                    return Ok(false);
                }
            }
        }
    }

    #[instrument(skip(self), fields(lock.key = %self.key, backend = "lease"))]
    async fn unlock(&self) -> LockResult<()> {
        self.registry.exit(&self.key);
        if self.registry.is_entered(&self.key) {
            // Nested release; the store key stays until the last exit.
            return Ok(());
        }

        if self.clean().await? {
            Ok(())
        } else {
            tracing::warn!(key = %self.key, "lease expired before release");
            Err(LockError::Expired)
        }
    }
}
