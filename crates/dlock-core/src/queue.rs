//! Fair queueing lock over a hierarchical coordination service.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{Span, instrument};

use crate::coord::CoordinationService;
use crate::error::{LockError, LockResult};
use crate::reentrancy::ReentrancyRegistry;
use crate::timeout::Deadline;
use crate::traits::DistributedLock;

/// Separator between the lock name and the service-assigned sequence number
/// in a queue node's name.
const SEQ_SEPARATOR: &str = "_lock_";

/// Default persistent root under which queue nodes are created.
pub const DEFAULT_ROOT: &str = "/locks";

/// Sequential-node lock granting acquisition strictly in request order.
///
/// Contenders create ephemeral sequential nodes under a shared persistent
/// root. Among the nodes carrying this lock's name, the smallest sequence
/// holds the lock; every other contender suspends on a one-shot deletion
/// watch of its immediate predecessor only, so one release wakes exactly
/// one waiter instead of the whole queue.
///
/// Losing the service session removes the ephemeral node and thereby
/// releases the lock without any `unlock` call: an acquired lock whose
/// session lapsed has been released, silently, and the holder learns about
/// it only through its own session handling.
pub struct FairQueueLock {
    service: Arc<dyn CoordinationService>,
    root: String,
    name: String,
    key: String,
    /// Full path of this handle's queue node while the lock is held.
    node: Mutex<Option<String>>,
    registry: ReentrancyRegistry,
}

impl FairQueueLock {
    /// Creates a handle for `name` under the default root.
    pub fn new(service: Arc<dyn CoordinationService>, name: &str) -> LockResult<Self> {
        Self::with_root(service, DEFAULT_ROOT, name)
    }

    /// Creates a handle for `name` under an explicit persistent root path.
    pub fn with_root(
        service: Arc<dyn CoordinationService>,
        root: &str,
        name: &str,
    ) -> LockResult<Self> {
        if name.is_empty() || name.contains('/') || name.contains(SEQ_SEPARATOR) {
            return Err(LockError::InvalidName(format!(
                "queue lock names must be non-empty and free of '/' and '{SEQ_SEPARATOR}', got '{name}'"
            )));
        }
        let root = root.trim_end_matches('/').to_string();
        let key = format!("{root}/{name}");
        Ok(Self {
            service,
            root,
            name: name.to_string(),
            key,
            node: Mutex::new(None),
            registry: ReentrancyRegistry::new(),
        })
    }

    fn node_prefix(&self) -> String {
        format!("{}/{}{}", self.root, self.name, SEQ_SEPARATOR)
    }

    fn node_path(&self, sequence: u64) -> String {
        format!("{}{:010}", self.node_prefix(), sequence)
    }

    /// Splits a child node name into its lock name and sequence number.
    fn parse_child(child: &str) -> Option<(&str, u64)> {
        let (name, sequence) = child.rsplit_once(SEQ_SEPARATOR)?;
        Some((name, sequence.parse().ok()?))
    }

    /// Creates the persistent root if it is not there yet.
    async fn ensure_root(&self) -> LockResult<()> {
        if !self.service.exists(&self.root).await? {
            self.service.create_persistent(&self.root).await?;
        }
        Ok(())
    }

    /// Sorted sequence numbers of the live contenders for this lock's name.
    ///
    /// The root is shared between differently named locks, so the listing
    /// is filtered to this name before any ordering decision. Fairness is
    /// per-name order, not global sequence order.
    async fn contenders(&self) -> LockResult<Vec<u64>> {
        let children = self.service.children(&self.root).await?;
        let mut sequences: Vec<u64> = children
            .iter()
            .filter_map(|child| Self::parse_child(child))
            .filter(|(name, _)| *name == self.name)
            .map(|(_, sequence)| sequence)
            .collect();
        sequences.sort_unstable();
        Ok(sequences)
    }

    /// Waits until this contender's node is the smallest for its name or
    /// the deadline passes. Does not clean up the node on failure.
    async fn wait_until_head(
        &self,
        deadline: &Deadline,
        my_sequence: u64,
    ) -> LockResult<bool> {
        loop {
            let sequences = self.contenders().await?;
            if !sequences.contains(&my_sequence) {
                return Err(LockError::Backend(Box::new(std::io::Error::other(
                    "queue node disappeared while waiting; session was lost",
                ))));
            }
            if sequences.first() == Some(&my_sequence) {
                return Ok(true);
            }

            let Some(remaining) = deadline.remaining() else {
                return Ok(false);
            };

            // Wait on the immediate predecessor only; its deletion wakes
            // exactly this contender.
            let Some(&predecessor) = sequences.iter().rev().find(|&&s| s < my_sequence) else {
                // The predecessor vanished between the listing and now;
                // re-check, we may already be head.
                continue;
            };
            if let Some(removed) = self.service.watch_delete(&self.node_path(predecessor)).await? {
                // Woken or timed out, either way the loop re-checks whether
                // this node is now the smallest before giving up.
                let _ = tokio::time::timeout(remaining, removed).await;
            }
        }
    }
}

impl DistributedLock for FairQueueLock {
    fn key(&self) -> &str {
        &self.key
    }

    #[instrument(skip(self), fields(lock.key = %self.key, backend = "queue", timeout = ?timeout))]
    async fn try_lock_for(&self, timeout: Duration) -> LockResult<bool> {
        if self.registry.is_entered(&self.key) {
            Span::current().record("reentrant", true);
            self.registry.enter(&self.key);
            return Ok(true);
        }

        let deadline = Deadline::after(timeout);
        self.ensure_root().await?;

        // Joining the queue is the acquisition request; the sequence number
        // assigned here fixes this contender's place in line.
        let my_path = self.service.create_ephemeral_sequential(&self.node_prefix()).await?;
        let my_sequence = my_path
            .rsplit('/')
            .next()
            .and_then(Self::parse_child)
            .map(|(_, sequence)| sequence)
            .ok_or_else(|| {
                LockError::Backend(Box::new(std::io::Error::other(format!(
                    "coordination service returned unparseable node path '{my_path}'"
                ))))
            })?;
        Span::current().record("sequence", my_sequence);

        match self.wait_until_head(&deadline, my_sequence).await {
            Ok(true) => {
                tracing::info!(key = %self.key, sequence = my_sequence, "locked as head of queue");
                *self.node.lock().expect("queue node poisoned") = Some(my_path);
                self.registry.enter(&self.key);
                Ok(true)
            }
            Ok(false) => {
                // Out of budget and never became head: withdraw from the
                // queue so successors are not stuck behind a dead request.
                let _ = self.service.delete(&my_path).await;
                Span::current().record("acquired", false);
                Ok(false)
            }
            Err(error) => {
                let _ = self.service.delete(&my_path).await;
                Err(error)
            }
        }
    }

    #[instrument(skip(self), fields(lock.key = %self.key, backend = "queue"))]
    async fn unlock(&self) -> LockResult<()> {
        self.registry.exit(&self.key);
        if self.registry.is_entered(&self.key) {
            return Ok(());
        }

        let node = self.node.lock().expect("queue node poisoned").take();
        let Some(path) = node else {
            tracing::warn!(key = %self.key, "unlock without a held queue node");
            return Ok(());
        };

        if !self.service.delete(&path).await? {
            // The session already dropped the node, which means the lock
            // was released out from under us some time ago.
            tracing::warn!(key = %self.key, node = %path, "queue node already removed; lock was implicitly released");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::FairQueueLock;

    #[test]
    fn parse_child_splits_name_and_sequence() {
        assert_eq!(
            FairQueueLock::parse_child("orders_lock_0000000042"),
            Some(("orders", 42))
        );
        assert_eq!(FairQueueLock::parse_child("orders"), None);
        assert_eq!(FairQueueLock::parse_child("orders_lock_abc"), None);
    }

    #[test]
    fn parse_child_keeps_names_containing_underscores() {
        assert_eq!(
            FairQueueLock::parse_child("daily_report_lock_0000000007"),
            Some(("daily_report", 7))
        );
    }
}
