//! Timestamp-takeover store lock.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{Span, instrument};

use crate::error::LockResult;
use crate::reentrancy::ReentrancyRegistry;
use crate::store::KeyValueStore;
use crate::timeout::Deadline;
use crate::traits::DistributedLock;

/// Current time in milliseconds since the Unix epoch.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}

/// Store lock whose value is the lease-expiry instant in epoch milliseconds.
///
/// There is no owner token: any contender that reads a stale timestamp may
/// take the lock over with an atomic read-and-replace, succeeding only when
/// the value it displaced equals the value it just read. Release reads the
/// current value and deletes only on a match with the expiry this handle
/// recorded, a check-then-delete that is *not* atomic. Between the read and
/// the delete another contender can take over, and this handle will then
/// either delete a lock it no longer owns or quietly do nothing.
///
/// This is the intended cheaper, weaker sibling of [`LeaseLock`]: it trades
/// the ownership guarantee for takeover without scripting support. Heavy
/// read-and-replace traffic is also more expensive for the store under
/// contention.
///
/// [`LeaseLock`]: crate::lease::LeaseLock
pub struct TimestampLock {
    store: Arc<dyn KeyValueStore>,
    key: String,
    lease: Duration,
    /// Expiry written by this handle's most recent successful acquisition.
    value: Mutex<Option<u64>>,
    registry: ReentrancyRegistry,
}

impl TimestampLock {
    pub fn new(store: Arc<dyn KeyValueStore>, key: String, lease: Duration) -> Self {
        Self {
            store,
            key,
            lease,
            value: Mutex::new(None),
            registry: ReentrancyRegistry::new(),
        }
    }

    /// Lease applied to every acquisition by this handle.
    pub fn lease(&self) -> Duration {
        self.lease
    }

    fn record_value(&self, candidate: u64) {
        *self.value.lock().expect("lock value poisoned") = Some(candidate);
    }
}

impl DistributedLock for TimestampLock {
    fn key(&self) -> &str {
        &self.key
    }

    #[instrument(skip(self), fields(lock.key = %self.key, backend = "timestamp", timeout = ?timeout))]
    async fn try_lock_for(&self, timeout: Duration) -> LockResult<bool> {
        if self.registry.is_entered(&self.key) {
            Span::current().record("reentrant", true);
            self.registry.enter(&self.key);
            return Ok(true);
        }

        let deadline = Deadline::after(timeout);
        loop {
            // A fresh expiry is computed per attempt; whoever wins writes
            // its own lease end.
            let now = now_millis();
            let candidate = now + self.lease.as_millis() as u64;
            let candidate_value = candidate.to_string();

            if self.store.set_nx(&self.key, &candidate_value).await? {
                tracing::info!(key = %self.key, "locked by conditional set");
                self.record_value(candidate);
                self.registry.enter(&self.key);
                return Ok(true);
            }

            if let Some(current) = self.store.get(&self.key).await? {
                let stale = current.parse::<u64>().map(|ts| ts < now).unwrap_or(false);
                if stale {
                    // Takeover: replace the stale expiry, but only count it
                    // as ours if the value we displaced is the one we read.
                    let previous = self.store.get_set(&self.key, &candidate_value).await?;
                    if previous.as_deref() == Some(current.as_str()) {
                        tracing::info!(key = %self.key, "locked by takeover");
                        self.record_value(candidate);
                        self.registry.enter(&self.key);
                        return Ok(true);
                    }
                }
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

    /// Best-effort release: deletes the key only while it still holds the
    /// expiry this handle wrote. A mismatch means the lease lapsed and
    /// someone took over; that is logged, not raised, because without a
    /// token this handle cannot tell its own stale value from a successor's.
    #[instrument(skip(self), fields(lock.key = %self.key, backend = "timestamp"))]
    async fn unlock(&self) -> LockResult<()> {
        self.registry.exit(&self.key);
        if self.registry.is_entered(&self.key) {
            return Ok(());
        }

        let recorded = self.value.lock().expect("lock value poisoned").take();
        let Some(recorded) = recorded else {
            tracing::warn!(key = %self.key, "unlock without a recorded acquisition");
            return Ok(());
        };

        match self.store.get(&self.key).await? {
            Some(current) if current == recorded.to_string() => {
                self.store.delete(&self.key).await?;
            }
            _ => {
                tracing::warn!(
                    key = %self.key,
                    "lock value changed before release; leaving the key in place"
                );
            }
        }
        Ok(())
    }
}
