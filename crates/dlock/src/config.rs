//! Configuration surface consumed by the lock factory.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default key prefix for every lock.
pub const DEFAULT_NAMESPACE: &str = "distributed:lock";

/// Default lease applied when the caller does not pass one: 30 minutes.
pub const DEFAULT_LEASE_MILLIS: u64 = 30 * 60 * 1000;

/// Backend variant selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Lease lock: one conditional set with expiry, token-checked delete.
    RedisExpire,
    /// Timestamp lock: expiry-timestamp value with read-and-replace
    /// takeover and no ownership token.
    RedisGetSet,
    /// Majority quorum of lease locks over independent stores.
    RedLock,
    /// Fair queueing lock on a hierarchical coordination service.
    Zookeeper,
}

/// Locker settings, typically deserialized from the host application's
/// configuration tree.
///
/// The backend tag accepts the same values under `backend` or `type`:
/// `redis-expire`, `redis-get-set`, `red-lock`, `zookeeper`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LockerConfig {
    /// Master switch; a disabled configuration yields no factory.
    pub enabled: bool,
    /// Selected backend variant. Leaving it unset is a configuration error
    /// surfaced when the factory is built, never a silent default.
    #[serde(alias = "type")]
    pub backend: Option<Backend>,
    /// Prefix joined to every lock name to form the store key.
    pub namespace: String,
    /// Lease applied when the caller does not pass one, in milliseconds.
    pub default_lease_millis: u64,
}

impl Default for LockerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_lease_millis: DEFAULT_LEASE_MILLIS,
        }
    }
}

impl LockerConfig {
    /// The configured default lease as a duration.
    pub fn default_lease(&self) -> Duration {
        Duration::from_millis(self.default_lease_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_tags_use_kebab_case() {
        let backend: Backend = serde_json::from_str("\"redis-expire\"").unwrap();
        assert_eq!(backend, Backend::RedisExpire);
        let backend: Backend = serde_json::from_str("\"red-lock\"").unwrap();
        assert_eq!(backend, Backend::RedLock);
    }

    #[test]
    fn config_accepts_type_as_backend_alias() {
        let config: LockerConfig =
            serde_json::from_str(r#"{"enabled": true, "type": "zookeeper"}"#).unwrap();
        assert_eq!(config.backend, Some(Backend::Zookeeper));
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let config: LockerConfig = serde_json::from_str("{}").unwrap();
        assert!(config.enabled);
        assert_eq!(config.backend, None);
        assert_eq!(config.default_lease(), Duration::from_secs(30 * 60));
    }
}
