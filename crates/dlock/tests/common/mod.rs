//! Shared in-memory fakes for exercising the locks without live stores.
#![allow(dead_code)]

pub mod memory_coordination;
pub mod memory_store;
