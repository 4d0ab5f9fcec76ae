//! In-memory key-value stores honoring the atomic command protocol.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dlock_core::error::{LockError, LockResult};
use dlock_core::store::KeyValueStore;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.map(|at| at <= Instant::now()).unwrap_or(false)
    }
}

/// Single-process stand-in for one independent store instance, with TTL
/// support so lease expiry behaves like the real thing.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn drop_if_expired(entries: &mut HashMap<String, Entry>, key: &str) {
        if entries.get(key).map(Entry::is_expired).unwrap_or(false) {
            entries.remove(key);
        }
    }

    /// Live value currently stored under `key`, honoring expiry.
    pub fn value_of(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap();
        Self::drop_if_expired(&mut entries, key);
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Whether a live value exists under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.value_of(key).is_some()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_nx_px(&self, key: &str, value: &str, ttl: Duration) -> LockResult<bool> {
        let mut entries = self.entries.lock().unwrap();
        Self::drop_if_expired(&mut entries, key);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn delete_eq(&self, key: &str, value: &str) -> LockResult<bool> {
        let mut entries = self.entries.lock().unwrap();
        Self::drop_if_expired(&mut entries, key);
        if entries.get(key).map(|entry| entry.value == value).unwrap_or(false) {
            entries.remove(key);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn set_nx(&self, key: &str, value: &str) -> LockResult<bool> {
        let mut entries = self.entries.lock().unwrap();
        Self::drop_if_expired(&mut entries, key);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(true)
    }

    async fn get(&self, key: &str) -> LockResult<Option<String>> {
        Ok(self.value_of(key))
    }

    async fn get_set(&self, key: &str, value: &str) -> LockResult<Option<String>> {
        let mut entries = self.entries.lock().unwrap();
        Self::drop_if_expired(&mut entries, key);
        let previous = entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                // A read-and-replace drops any expiry, like GETSET does.
                expires_at: None,
            },
        );
        Ok(previous.map(|entry| entry.value))
    }

    async fn delete(&self, key: &str) -> LockResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Store whose every command fails, simulating an unreachable instance.
pub struct UnreachableStore;

impl UnreachableStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }

    fn unreachable() -> LockError {
        LockError::Backend(Box::new(std::io::Error::other("store unreachable")))
    }
}

#[async_trait]
impl KeyValueStore for UnreachableStore {
    async fn set_nx_px(&self, _key: &str, _value: &str, _ttl: Duration) -> LockResult<bool> {
        Err(Self::unreachable())
    }

    async fn delete_eq(&self, _key: &str, _value: &str) -> LockResult<bool> {
        Err(Self::unreachable())
    }

    async fn set_nx(&self, _key: &str, _value: &str) -> LockResult<bool> {
        Err(Self::unreachable())
    }

    async fn get(&self, _key: &str) -> LockResult<Option<String>> {
        Err(Self::unreachable())
    }

    async fn get_set(&self, _key: &str, _value: &str) -> LockResult<Option<String>> {
        Err(Self::unreachable())
    }

    async fn delete(&self, _key: &str) -> LockResult<()> {
        Err(Self::unreachable())
    }
}

/// Wrapper counting every store command, for asserting fast paths that
/// must not contact the store at all.
pub struct CountingStore {
    inner: Arc<dyn KeyValueStore>,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn wrap(inner: Arc<dyn KeyValueStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    /// Total store commands issued through this wrapper.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn set_nx_px(&self, key: &str, value: &str, ttl: Duration) -> LockResult<bool> {
        self.count();
        self.inner.set_nx_px(key, value, ttl).await
    }

    async fn delete_eq(&self, key: &str, value: &str) -> LockResult<bool> {
        self.count();
        self.inner.delete_eq(key, value).await
    }

    async fn set_nx(&self, key: &str, value: &str) -> LockResult<bool> {
        self.count();
        self.inner.set_nx(key, value).await
    }

    async fn get(&self, key: &str) -> LockResult<Option<String>> {
        self.count();
        self.inner.get(key).await
    }

    async fn get_set(&self, key: &str, value: &str) -> LockResult<Option<String>> {
        self.count();
        self.inner.get_set(key, value).await
    }

    async fn delete(&self, key: &str) -> LockResult<()> {
        self.count();
        self.inner.delete(key).await
    }
}
