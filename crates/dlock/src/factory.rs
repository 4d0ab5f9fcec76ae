//! Backend-selecting lock factory.

use std::sync::Arc;
use std::time::Duration;

use dlock_core::coord::CoordinationService;
use dlock_core::error::{LockError, LockResult};
use dlock_core::lease::LeaseLock;
use dlock_core::queue::FairQueueLock;
use dlock_core::quorum::QuorumLock;
use dlock_core::store::KeyValueStore;
use dlock_core::timestamp::TimestampLock;
use dlock_core::traits::{DistributedLock, LockFactory};

use crate::config::{Backend, LockerConfig};

/// Separator between the namespace and the lock name in a store key.
const KEY_SEPARATOR: &str = ":";

/// Lock handle produced by [`DLockFactory`], one variant per backend.
pub enum DLock {
    Lease(LeaseLock),
    Timestamp(TimestampLock),
    Quorum(QuorumLock),
    Queue(FairQueueLock),
}

impl DistributedLock for DLock {
    fn key(&self) -> &str {
        match self {
            DLock::Lease(lock) => lock.key(),
            DLock::Timestamp(lock) => lock.key(),
            DLock::Quorum(lock) => lock.key(),
            DLock::Queue(lock) => lock.key(),
        }
    }

    async fn try_lock_for(&self, timeout: Duration) -> LockResult<bool> {
        match self {
            DLock::Lease(lock) => lock.try_lock_for(timeout).await,
            DLock::Timestamp(lock) => lock.try_lock_for(timeout).await,
            DLock::Quorum(lock) => lock.try_lock_for(timeout).await,
            DLock::Queue(lock) => lock.try_lock_for(timeout).await,
        }
    }

    async fn unlock(&self) -> LockResult<()> {
        match self {
            DLock::Lease(lock) => lock.unlock().await,
            DLock::Timestamp(lock) => lock.unlock().await,
            DLock::Quorum(lock) => lock.unlock().await,
            DLock::Queue(lock) => lock.unlock().await,
        }
    }
}

/// Configuration-driven factory binding lock handles to externally supplied
/// store clients.
///
/// Client construction, pooling, and connection parameters belong to the
/// caller; the factory only selects the backend variant, namespaces the
/// key, and hands each handle the clients it needs.
pub struct DLockFactory {
    config: LockerConfig,
    stores: Vec<Arc<dyn KeyValueStore>>,
    coordination: Option<Arc<dyn CoordinationService>>,
}

impl DLockFactory {
    /// Returns a new builder.
    pub fn builder() -> DLockFactoryBuilder {
        DLockFactoryBuilder::new()
    }

    /// The active configuration.
    pub fn config(&self) -> &LockerConfig {
        &self.config
    }

    fn key_for(&self, name: &str) -> String {
        format!("{}{}{}", self.config.namespace, KEY_SEPARATOR, name)
    }

    fn single_store(&self, backend: Backend) -> LockResult<Arc<dyn KeyValueStore>> {
        self.stores.first().cloned().ok_or_else(|| {
            LockError::NotObtained(format!("{backend:?} backend requires a store client"))
        })
    }

    fn build_lock(&self, name: &str, lease: Duration) -> LockResult<DLock> {
        if name.is_empty() {
            return Err(LockError::InvalidName(
                "lock names must be non-empty".to_string(),
            ));
        }
        let backend = self
            .config
            .backend
            .ok_or_else(|| LockError::NotObtained("no locker backend configured".to_string()))?;

        match backend {
            Backend::RedisExpire => {
                let store = self.single_store(backend)?;
                Ok(DLock::Lease(LeaseLock::new(store, self.key_for(name), lease)))
            }
            Backend::RedisGetSet => {
                let store = self.single_store(backend)?;
                Ok(DLock::Timestamp(TimestampLock::new(
                    store,
                    self.key_for(name),
                    lease,
                )))
            }
            Backend::RedLock => {
                if self.stores.is_empty() {
                    return Err(LockError::NotObtained(
                        "red-lock backend requires at least one store client".to_string(),
                    ));
                }
                Ok(DLock::Quorum(QuorumLock::new(
                    self.stores.clone(),
                    self.key_for(name),
                    lease,
                )))
            }
            Backend::Zookeeper => {
                let service = self.coordination.clone().ok_or_else(|| {
                    LockError::NotObtained(
                        "zookeeper backend requires a coordination service".to_string(),
                    )
                })?;
                Ok(DLock::Queue(FairQueueLock::new(service, name)?))
            }
        }
    }
}

impl LockFactory for DLockFactory {
    type Lock = DLock;

    fn get_lock(&self, name: &str) -> LockResult<DLock> {
        self.build_lock(name, self.config.default_lease())
    }

    fn get_lock_with_lease(&self, name: &str, lease: Duration) -> LockResult<DLock> {
        self.build_lock(name, lease)
    }
}

/// Builder for [`DLockFactory`].
pub struct DLockFactoryBuilder {
    config: LockerConfig,
    stores: Vec<Arc<dyn KeyValueStore>>,
    coordination: Option<Arc<dyn CoordinationService>>,
}

impl DLockFactoryBuilder {
    pub fn new() -> Self {
        Self {
            config: LockerConfig::default(),
            stores: vec![],
            coordination: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: LockerConfig) -> Self {
        self.config = config;
        self
    }

    /// Selects the backend variant.
    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = Some(backend);
        self
    }

    /// Overrides the key namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Overrides the default lease.
    pub fn default_lease(mut self, lease: Duration) -> Self {
        self.config.default_lease_millis = lease.as_millis() as u64;
        self
    }

    /// Adds one key-value store client.
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.stores.push(store);
        self
    }

    /// Adds several key-value store clients, one per independent server.
    pub fn stores(mut self, stores: Vec<Arc<dyn KeyValueStore>>) -> Self {
        self.stores.extend(stores);
        self
    }

    /// Supplies the coordination-service session for the queue backend.
    pub fn coordination(mut self, service: Arc<dyn CoordinationService>) -> Self {
        self.coordination = Some(service);
        self
    }

    /// Validates the configuration and builds the factory.
    ///
    /// Misconfiguration (locking disabled, no backend selected, or a
    /// backend whose clients were not supplied) surfaces here as
    /// [`LockError::NotObtained`] rather than at first use.
    pub fn build(self) -> LockResult<DLockFactory> {
        if !self.config.enabled {
            return Err(LockError::NotObtained(
                "locking is disabled by configuration".to_string(),
            ));
        }
        let backend = self
            .config
            .backend
            .ok_or_else(|| LockError::NotObtained("no locker backend configured".to_string()))?;

        match backend {
            Backend::RedisExpire | Backend::RedisGetSet | Backend::RedLock => {
                if self.stores.is_empty() {
                    return Err(LockError::NotObtained(format!(
                        "{backend:?} backend requires at least one store client"
                    )));
                }
            }
            Backend::Zookeeper => {
                if self.coordination.is_none() {
                    return Err(LockError::NotObtained(
                        "zookeeper backend requires a coordination service".to_string(),
                    ));
                }
            }
        }

        tracing::debug!(
            ?backend,
            namespace = %self.config.namespace,
            stores = self.stores.len(),
            "lock factory configured"
        );
        Ok(DLockFactory {
            config: self.config,
            stores: self.stores,
            coordination: self.coordination,
        })
    }
}

impl Default for DLockFactoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
