//! Core traits and locking algorithms for dlock distributed locks.
//!
//! Everything in this crate is store-agnostic: the locks speak to their
//! backing store through the [`store::KeyValueStore`] and
//! [`coord::CoordinationService`] protocols, so the algorithms can be
//! exercised with in-memory fakes and bound to real clients elsewhere.

pub mod coord;
pub mod error;
pub mod executor;
pub mod lease;
pub mod prelude;
pub mod queue;
pub mod quorum;
pub mod reentrancy;
pub mod store;
pub mod timeout;
pub mod timestamp;
pub mod traits;

pub use error::{LockError, LockResult};
pub use prelude::*;
