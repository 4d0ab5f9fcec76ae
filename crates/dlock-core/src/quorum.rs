//! Majority-quorum composition over independent stores.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{Span, instrument};

use crate::error::{LockError, LockResult};
use crate::lease::LeaseLock;
use crate::reentrancy::ReentrancyRegistry;
use crate::store::KeyValueStore;
use crate::timeout::Deadline;
use crate::traits::DistributedLock;

/// Strict-majority threshold for `n` stores.
pub(crate) fn majority(n: usize) -> usize {
    n / 2 + 1
}

/// Lock held only while a strict majority of independently operated stores
/// grant it.
///
/// Each store gets its own [`LeaseLock`] with its own owner token. The
/// stores must be independent instances rather than replicas of one
/// cluster; surviving the failure of individual stores is the point of the
/// composition. An acquisition round only counts when it completes fast
/// enough that the freshly written leases still have at least
/// `min_validity` left; slower rounds release whatever they grabbed and are
/// retried.
pub struct QuorumLock {
    key: String,
    locks: Vec<LeaseLock>,
    lease: Duration,
    min_validity: Duration,
    /// Which stores granted the current acquisition, by position.
    acquired: Mutex<Vec<bool>>,
    registry: ReentrancyRegistry,
}

impl QuorumLock {
    /// Composes `stores` for `key` with a validity floor of 90% of the
    /// lease.
    pub fn new(stores: Vec<Arc<dyn KeyValueStore>>, key: String, lease: Duration) -> Self {
        let min_validity = lease.mul_f64(0.9);
        Self::with_min_validity(stores, key, lease, min_validity)
    }

    /// Composes `stores` with an explicit minimum validity requirement.
    pub fn with_min_validity(
        stores: Vec<Arc<dyn KeyValueStore>>,
        key: String,
        lease: Duration,
        min_validity: Duration,
    ) -> Self {
        let acquired = Mutex::new(vec![false; stores.len()]);
        let locks = stores
            .into_iter()
            .map(|store| LeaseLock::new(store, key.clone(), lease))
            .collect();
        Self {
            key,
            locks,
            lease,
            min_validity,
            acquired,
            registry: ReentrancyRegistry::new(),
        }
    }

    /// Number of composed stores.
    pub fn store_count(&self) -> usize {
        self.locks.len()
    }

    /// Time one acquisition round may take while still leaving
    /// `min_validity` on the shortest freshly written lease.
    fn round_budget(&self) -> Duration {
        self.lease.saturating_sub(self.min_validity)
    }

    /// One parallel acquisition round across every store.
    ///
    /// A store error counts as a failed grant for that store. Losing
    /// individual stores must not sink the round while a majority remains
    /// reachable.
    async fn acquire_round(&self) -> Vec<bool> {
        let attempts = join_all(self.locks.iter().map(|lock| lock.try_set())).await;
        attempts
            .into_iter()
            .enumerate()
            .map(|(position, outcome)| match outcome {
                Ok(granted) => granted,
                Err(error) => {
                    tracing::warn!(key = %self.key, position, %error, "store attempt failed");
                    false
                }
            })
            .collect()
    }

    /// Best-effort release on every store marked in `acquired`; returns the
    /// number of releases that errored.
    async fn release_stores(&self, acquired: &[bool]) -> usize {
        let cleanups = self
            .locks
            .iter()
            .zip(acquired)
            .filter(|&(_, &granted)| granted)
            .map(|(lock, _)| lock.clean());
        join_all(cleanups)
            .await
            .into_iter()
            .filter(|outcome| {
                if let Err(error) = outcome {
                    tracing::warn!(key = %self.key, %error, "store release failed");
                    true
                } else {
                    // A token mismatch just means that lease already lapsed;
                    // nothing is held there anymore.
                    false
                }
            })
            .count()
    }
}

impl DistributedLock for QuorumLock {
    fn key(&self) -> &str {
        &self.key
    }

    #[instrument(skip(self), fields(lock.key = %self.key, backend = "quorum", stores = self.locks.len(), timeout = ?timeout))]
    async fn try_lock_for(&self, timeout: Duration) -> LockResult<bool> {
        if self.registry.is_entered(&self.key) {
            Span::current().record("reentrant", true);
            self.registry.enter(&self.key);
            return Ok(true);
        }
        if self.locks.is_empty() {
            return Err(LockError::NotObtained("no stores composed".to_string()));
        }

        let deadline = Deadline::after(timeout);
        loop {
            let round_start = Instant::now();
            let results = self.acquire_round().await;
            let granted = results.iter().filter(|&&g| g).count();
            let elapsed = round_start.elapsed();

            if granted >= majority(self.locks.len()) && elapsed < self.round_budget() {
                Span::current().record("stores_acquired", granted);
                tracing::info!(key = %self.key, granted, "locked by majority quorum");
                *self.acquired.lock().expect("acquired bitmap poisoned") = results;
                self.registry.enter(&self.key);
                return Ok(true);
            }

            // No quorum, or the round ate too far into the lease: back out
            // of every store we did reach before retrying.
            self.release_stores(&results).await;

            match deadline.poll_sleep() {
                Some(sleep) => tokio::time::sleep(sleep).await,
                None => {
                    Span::current().record("acquired", false);
                    return Ok(false);
                }
            }
        }
    }

    /// Releases every store that granted the current acquisition,
    /// continuing past individual failures; a logical release must never
    /// leave a majority of stores holding a phantom lock.
    #[instrument(skip(self), fields(lock.key = %self.key, backend = "quorum"))]
    async fn unlock(&self) -> LockResult<()> {
        self.registry.exit(&self.key);
        if self.registry.is_entered(&self.key) {
            return Ok(());
        }

        let acquired = std::mem::replace(
            &mut *self.acquired.lock().expect("acquired bitmap poisoned"),
            vec![false; self.locks.len()],
        );
        let attempted = acquired.iter().filter(|&&granted| granted).count();
        if attempted == 0 {
            return Ok(());
        }

        let failures = self.release_stores(&acquired).await;
        if attempted - failures >= majority(attempted) || failures == 0 {
            Ok(())
        } else {
            Err(LockError::Backend(Box::new(std::io::Error::other(
                "failed to release quorum lock on a majority of stores",
            ))))
        }
    }
}
