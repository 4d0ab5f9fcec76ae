//! Convenience prelude for dlock types.

pub use crate::coord::CoordinationService;
pub use crate::error::{LockError, LockResult};
pub use crate::executor::LockingExecutor;
pub use crate::lease::LeaseLock;
pub use crate::queue::FairQueueLock;
pub use crate::quorum::QuorumLock;
pub use crate::reentrancy::ReentrancyRegistry;
pub use crate::store::KeyValueStore;
pub use crate::timestamp::TimestampLock;
pub use crate::traits::{DistributedLock, LockFactory};
