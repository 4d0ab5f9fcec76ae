//! Key-value store protocol used by the lease, timestamp, and quorum locks.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::LockResult;

/// Atomic commands a key-value store must provide to back a lock.
///
/// Each method maps to one atomic command on the store. All mutual-exclusion
/// guarantees come from the store's atomicity; no client-side mutex ever
/// serializes contending callers. An in-flight command cannot be aborted:
/// timeouts bound the retry loop around these calls, not the calls
/// themselves.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// `SET key value PX <ttl> NX`: writes the value with an expiry only if
    /// the key was absent, returning whether it was written.
    async fn set_nx_px(&self, key: &str, value: &str, ttl: Duration) -> LockResult<bool>;

    /// Scripted conditional delete: removes the key only while it still
    /// holds exactly `value`, returning whether the delete happened.
    async fn delete_eq(&self, key: &str, value: &str) -> LockResult<bool>;

    /// `SETNX key value`: set-if-absent without an expiry.
    async fn set_nx(&self, key: &str, value: &str) -> LockResult<bool>;

    /// `GET key`.
    async fn get(&self, key: &str) -> LockResult<Option<String>>;

    /// `GETSET key value`: atomically replaces the value, returning the
    /// previous one.
    async fn get_set(&self, key: &str, value: &str) -> LockResult<Option<String>>;

    /// `DEL key`: unconditional delete.
    async fn delete(&self, key: &str) -> LockResult<()>;
}
