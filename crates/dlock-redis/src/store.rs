//! Redis implementation of the key-value store protocol.

use std::time::Duration;

use async_trait::async_trait;
use dlock_core::error::{LockError, LockResult};
use dlock_core::store::KeyValueStore;
use fred::prelude::*;
use fred::types::CustomCommand;

/// Lua script for the token-checked delete: the key is removed only while
/// it still holds the caller's value, and the delete count is returned so
/// the caller can tell a release from a no-op.
const DELETE_EQ_LUA: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('del', KEYS[1])
    end
    return 0
"#;

/// [`KeyValueStore`] over a single Redis client.
///
/// One `RedisStore` wraps one independently configured Redis instance; a
/// quorum composition takes several of these, each pointing at a distinct
/// server.
#[derive(Clone)]
pub struct RedisStore {
    client: RedisClient,
}

impl RedisStore {
    /// Wraps an already connected client.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Connects a dedicated client from a Redis URL.
    pub async fn connect(url: &str) -> LockResult<Self> {
        let config = RedisConfig::from_url(url).map_err(|e| {
            LockError::Backend(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid Redis URL: {}", e),
            )))
        })?;

        let client = RedisClient::new(config, None, None, None);
        client.connect();
        client.wait_for_connect().await.map_err(|e| {
            LockError::Backend(Box::new(std::io::Error::other(format!(
                "failed to connect to Redis: {}",
                e
            ))))
        })?;
        tracing::debug!(url, "connected Redis store");

        Ok(Self { client })
    }

    /// The underlying client.
    pub fn client(&self) -> &RedisClient {
        &self.client
    }

    fn command_error(operation: &str, error: RedisError) -> LockError {
        LockError::Backend(Box::new(std::io::Error::other(format!(
            "Redis {} failed: {}",
            operation, error
        ))))
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set_nx_px(&self, key: &str, value: &str, ttl: Duration) -> LockResult<bool> {
        // SET NX returns the OK status when the key was set, nil otherwise.
        let result: Option<String> = self
            .client
            .set(
                key,
                value,
                Some(Expiration::PX(ttl.as_millis() as i64)),
                Some(SetOptions::NX),
                false,
            )
            .await
            .map_err(|e| Self::command_error("SET NX PX", e))?;
        Ok(result.is_some())
    }

    async fn delete_eq(&self, key: &str, value: &str) -> LockResult<bool> {
        let args: Vec<RedisValue> = vec![
            DELETE_EQ_LUA.into(),
            1_i64.into(), // numkeys
            key.into(),
            value.into(),
        ];
        let cmd = CustomCommand::new_static("EVAL", None, false);

        let deleted: i64 = self
            .client
            .custom(cmd, args)
            .await
            .map_err(|e| Self::command_error("EVAL (delete_eq)", e))?;
        Ok(deleted == 1)
    }

    async fn set_nx(&self, key: &str, value: &str) -> LockResult<bool> {
        let result: Option<String> = self
            .client
            .set(key, value, None, Some(SetOptions::NX), false)
            .await
            .map_err(|e| Self::command_error("SET NX", e))?;
        Ok(result.is_some())
    }

    async fn get(&self, key: &str) -> LockResult<Option<String>> {
        self.client
            .get(key)
            .await
            .map_err(|e| Self::command_error("GET", e))
    }

    async fn get_set(&self, key: &str, value: &str) -> LockResult<Option<String>> {
        self.client
            .getset(key, value)
            .await
            .map_err(|e| Self::command_error("GETSET", e))
    }

    async fn delete(&self, key: &str) -> LockResult<()> {
        let _: i64 = self
            .client
            .del(key)
            .await
            .map_err(|e| Self::command_error("DEL", e))?;
        Ok(())
    }
}
