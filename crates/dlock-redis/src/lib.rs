//! Redis backend for dlock distributed locks.

pub mod provider;
pub mod store;

pub use provider::RedisStoreBuilder;
pub use store::RedisStore;
