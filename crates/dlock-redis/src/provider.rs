//! Builder assembling Redis-backed stores for a lock factory.

use std::sync::Arc;

use dlock_core::error::{LockError, LockResult};
use dlock_core::store::KeyValueStore;
use fred::prelude::*;

use crate::store::RedisStore;

/// Builder connecting one store per Redis server.
///
/// A single URL yields the store for the lease and timestamp backends; a
/// quorum composition wants several URLs pointing at independent servers,
/// ideally 3 or 5.
pub struct RedisStoreBuilder {
    urls: Vec<String>,
    clients: Vec<RedisClient>,
}

impl RedisStoreBuilder {
    pub fn new() -> Self {
        Self {
            urls: vec![],
            clients: vec![],
        }
    }

    /// Adds a Redis server URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(url.into());
        self
    }

    /// Adds multiple Redis server URLs.
    pub fn urls(mut self, urls: &[impl AsRef<str>]) -> Self {
        for url in urls {
            self.urls.push(url.as_ref().to_string());
        }
        self
    }

    /// Uses an existing Redis client.
    pub fn client(mut self, client: RedisClient) -> Self {
        self.clients.push(client);
        self
    }

    /// Connects every configured URL and returns the assembled stores.
    pub async fn build(self) -> LockResult<Vec<Arc<dyn KeyValueStore>>> {
        let mut stores: Vec<Arc<dyn KeyValueStore>> = self
            .clients
            .into_iter()
            .map(|client| Arc::new(RedisStore::new(client)) as Arc<dyn KeyValueStore>)
            .collect();

        for url in self.urls {
            stores.push(Arc::new(RedisStore::connect(&url).await?));
        }

        if stores.is_empty() {
            return Err(LockError::NotObtained(
                "no Redis clients or URLs provided".to_string(),
            ));
        }
        Ok(stores)
    }
}

impl Default for RedisStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
