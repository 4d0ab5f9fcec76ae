//! Hierarchical coordination-service protocol used by the fair queue lock.

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::LockResult;

/// Node operations a hierarchical coordination service must provide.
///
/// The service assigns monotonically increasing sequence numbers to
/// sequential nodes and removes ephemeral nodes when the session that
/// created them is lost. Session management itself belongs to the client
/// supplying this implementation, not to the locks built on top of it.
#[async_trait]
pub trait CoordinationService: Send + Sync {
    /// Whether a node exists at `path`.
    async fn exists(&self, path: &str) -> LockResult<bool>;

    /// Creates a persistent node, succeeding silently when it already
    /// exists.
    async fn create_persistent(&self, path: &str) -> LockResult<()>;

    /// Creates an ephemeral node whose final path is `prefix` followed by a
    /// zero-padded sequence number assigned by the service. The node is
    /// removed automatically when the creating session is lost.
    async fn create_ephemeral_sequential(&self, prefix: &str) -> LockResult<String>;

    /// Names (not full paths) of the children of `path`.
    async fn children(&self, path: &str) -> LockResult<Vec<String>>;

    /// Registers a one-shot deletion watch on `path`.
    ///
    /// Returns `None` when the node no longer exists, so there is nothing to
    /// wait for. Otherwise the receiver fires exactly once when the node is
    /// deleted, including removal through session loss.
    async fn watch_delete(&self, path: &str) -> LockResult<Option<oneshot::Receiver<()>>>;

    /// Deletes the node at `path`, returning `false` when it was already
    /// gone.
    async fn delete(&self, path: &str) -> LockResult<bool>;
}
