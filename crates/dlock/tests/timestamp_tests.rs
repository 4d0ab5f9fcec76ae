//! Behavior of the timestamp backend, including its deliberate weaknesses.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::memory_store::MemoryStore;
use dlock::{Backend, DLockFactory, DistributedLock, LockFactory};

const KEY: &str = "distributed:lock:resource";

fn timestamp_factory(store: Arc<dyn dlock::KeyValueStore>) -> DLockFactory {
    DLockFactory::builder()
        .backend(Backend::RedisGetSet)
        .store(store)
        .build()
        .unwrap()
}

#[tokio::test]
async fn acquire_and_release_round_trip() {
    let store = MemoryStore::new();
    let factory = timestamp_factory(store.clone());

    let lock = factory.get_lock("resource").unwrap();
    assert!(lock.try_lock_for(Duration::from_secs(1)).await.unwrap());

    // The stored value is the lease-expiry timestamp, not a token.
    let value = store.value_of(KEY).expect("key must be present while held");
    value.parse::<u64>().expect("value must be epoch millis");

    lock.unlock().await.unwrap();
    assert!(!store.contains(KEY));
}

#[tokio::test]
async fn second_handle_is_excluded_while_lease_is_fresh() {
    let store = MemoryStore::new();
    let factory = timestamp_factory(store.clone());

    let holder = factory.get_lock("resource").unwrap();
    assert!(holder.try_lock_for(Duration::from_secs(1)).await.unwrap());

    let contender = factory.get_lock("resource").unwrap();
    assert!(!contender.try_lock_for(Duration::ZERO).await.unwrap());

    holder.unlock().await.unwrap();
}

#[tokio::test]
async fn stale_holder_is_taken_over() {
    let store = MemoryStore::new();
    let factory = timestamp_factory(store.clone());

    let crashed = factory
        .get_lock_with_lease("resource", Duration::from_millis(100))
        .unwrap();
    assert!(crashed.try_lock_for(Duration::from_secs(1)).await.unwrap());
    // No unlock: a crashed holder leaves only its expiry timestamp behind.

    let contender = factory.get_lock("resource").unwrap();
    assert!(
        contender.try_lock_for(Duration::from_secs(2)).await.unwrap(),
        "a stale timestamp must be taken over"
    );
    contender.unlock().await.unwrap();
    assert!(!store.contains(KEY));
}

#[tokio::test]
async fn release_after_takeover_leaves_successor_untouched() {
    let store = MemoryStore::new();
    let factory = timestamp_factory(store.clone());

    let stale = factory
        .get_lock_with_lease("resource", Duration::from_millis(50))
        .unwrap();
    assert!(stale.try_lock_for(Duration::from_secs(1)).await.unwrap());

    tokio::time::sleep(Duration::from_millis(120)).await;

    let successor = factory.get_lock("resource").unwrap();
    assert!(successor.try_lock_for(Duration::from_secs(2)).await.unwrap());
    let successor_value = store.value_of(KEY).unwrap();

    // The displaced holder's release sees a changed value, logs, and
    // leaves the successor's lock in place. No error: without a token it
    // cannot distinguish expiry from takeover.
    stale.unlock().await.unwrap();
    assert_eq!(store.value_of(KEY), Some(successor_value));

    successor.unlock().await.unwrap();
    assert!(!store.contains(KEY));
}

#[tokio::test]
async fn reentrant_acquisition_and_balanced_release() {
    let store = MemoryStore::new();
    let factory = timestamp_factory(store.clone());

    let lock = factory.get_lock("resource").unwrap();
    assert!(lock.try_lock_for(Duration::from_secs(1)).await.unwrap());
    assert!(lock.try_lock_for(Duration::from_secs(1)).await.unwrap());

    lock.unlock().await.unwrap();
    assert!(store.contains(KEY), "nested release must keep the key");

    lock.unlock().await.unwrap();
    assert!(!store.contains(KEY));
}
