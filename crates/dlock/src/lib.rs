//! Reentrant distributed locks with multiple backend variants.
//!
//! Callers obtain a named lock backed by an external coordination store and
//! run a critical section while holding it, across independent processes
//! and machines. Four backends are available:
//!
//! - **redis-expire**: lease lock, one atomic set-if-absent-with-expiry
//!   command plus a token-checked delete.
//! - **redis-get-set**: timestamp lock, the value is a lease-expiry
//!   timestamp and stale holders are taken over with an atomic
//!   read-and-replace; no ownership token, deliberately weaker.
//! - **red-lock**: the same lease lock held on a strict majority of
//!   independent stores.
//! - **zookeeper**: fair queueing lock on a hierarchical coordination
//!   service, ephemeral sequential nodes, first request first granted.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use dlock::{Backend, DLockFactory, DistributedLock, LockingExecutor};
//! use dlock_redis::RedisStoreBuilder;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stores = RedisStoreBuilder::new()
//!         .url("redis://localhost:6379")
//!         .build()
//!         .await?;
//!
//!     let factory = DLockFactory::builder()
//!         .backend(Backend::RedisExpire)
//!         .stores(stores)
//!         .build()?;
//!
//!     // Raw handle: boolean contract, caller manages the release.
//!     use dlock::LockFactory;
//!     let lock = factory.get_lock("my-resource")?;
//!     if lock.try_lock_for(Duration::from_secs(5)).await? {
//!         // Critical section - we have exclusive access
//!         lock.unlock().await?;
//!     }
//!
//!     // Scoped helper: error contract, releases on every exit path.
//!     let executor = LockingExecutor::new(factory);
//!     executor
//!         .lock_and_execute("my-resource", || async {
//!             // Critical section
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! All backends are reentrant within the logical context driving a handle,
//! and none of them mask store errors: network failures propagate, lease
//! expiry discovered at release surfaces as [`LockError::Expired`].
//!
//! # Crate Organization
//!
//! This is a meta-crate that re-exports from:
//! - `dlock-core`: traits, the locking algorithms, and the executor
//! - `dlock-redis`: the Redis store binding
//!
//! The coordination-service backend binds to whatever session type the
//! caller supplies through [`CoordinationService`].

pub mod config;
pub mod factory;

// Re-export core types and traits
pub use dlock_core::*;

// Re-export the Redis store binding
pub use dlock_redis::{RedisStore, RedisStoreBuilder};

pub use config::{Backend, LockerConfig};
pub use factory::{DLock, DLockFactory, DLockFactoryBuilder};
